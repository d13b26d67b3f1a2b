use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Temperature unit a reading is expressed in. Controllers report in
/// whichever unit their settings select; conversion happens only when a
/// reading crosses into a different display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum TempUnit {
    #[serde(rename = "C", alias = "c", alias = "celsius", alias = "Celsius")]
    #[value(name = "c", alias = "celsius")]
    Celsius,
    #[serde(rename = "F", alias = "f", alias = "fahrenheit", alias = "Fahrenheit")]
    #[value(name = "f", alias = "fahrenheit")]
    Fahrenheit,
}

impl Default for TempUnit {
    fn default() -> Self {
        TempUnit::Celsius
    }
}

impl TempUnit {
    /// Convert a Celsius reading into this unit.
    pub fn convert(&self, celsius: f64) -> f64 {
        match self {
            TempUnit::Celsius => celsius,
            TempUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }

    /// Convert a value expressed in this unit back to Celsius.
    pub fn to_celsius(&self, value: f64) -> f64 {
        match self {
            TempUnit::Celsius => value,
            TempUnit::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            TempUnit::Celsius => "°C",
            TempUnit::Fahrenheit => "°F",
        }
    }

    /// Display string for a Celsius reading, e.g. `95.50 °C` / `203.90 °F`.
    pub fn format(&self, celsius: f64) -> String {
        format!("{:.2} {}", self.convert(celsius), self.symbol())
    }
}

impl fmt::Display for TempUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TempUnit::Celsius => write!(f, "C"),
            TempUnit::Fahrenheit => write!(f, "F"),
        }
    }
}

impl FromStr for TempUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "c" | "celsius" => Ok(TempUnit::Celsius),
            "f" | "fahrenheit" => Ok(TempUnit::Fahrenheit),
            other => Err(format!("unknown temperature unit: {}", other)),
        }
    }
}
