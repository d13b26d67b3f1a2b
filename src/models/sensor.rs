use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Probe hardware supported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum SensorKind {
    #[serde(rename = "MAX31865", alias = "max31865")]
    Max31865,
    #[serde(rename = "MAX31856", alias = "max31856")]
    Max31856,
    #[serde(rename = "MAX31855", alias = "max31855")]
    Max31855,
    #[serde(rename = "ADS1115", alias = "ads1115")]
    Ads1115,
    #[serde(rename = "DHT22", alias = "dht22")]
    Dht22,
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SensorKind::Max31865 => "MAX31865",
            SensorKind::Max31856 => "MAX31856",
            SensorKind::Max31855 => "MAX31855",
            SensorKind::Ads1115 => "ADS1115",
            SensorKind::Dht22 => "DHT22",
        };
        write!(f, "{}", name)
    }
}

/// One probe slot as stored by the controller. SPI chips use `pin` for
/// chip select, the ADS1115 uses an I2C `address` plus `channel`, and
/// the DHT22 uses `pin` as a GPIO number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    #[serde(default, alias = "sensor_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,

    pub name: String,

    #[serde(rename = "sensor_type", alias = "type", alias = "kind")]
    pub kind: SensorKind,

    #[serde(default, alias = "cs_pin", skip_serializing_if = "Option::is_none")]
    pub pin: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<u8>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl SensorConfig {
    /// Short wiring summary for table output, e.g. `CS 5` or `0x48 ch 0`.
    pub fn location_display(&self) -> String {
        match self.kind {
            SensorKind::Max31865 | SensorKind::Max31856 | SensorKind::Max31855 => self
                .pin
                .map(|pin| format!("CS {}", pin))
                .unwrap_or_else(|| "--".to_string()),
            SensorKind::Ads1115 => match (&self.address, self.channel) {
                (Some(address), Some(channel)) => format!("{} ch {}", address, channel),
                (Some(address), None) => address.clone(),
                _ => "--".to_string(),
            },
            SensorKind::Dht22 => self
                .pin
                .map(|pin| format!("GPIO {}", pin))
                .unwrap_or_else(|| "--".to_string()),
        }
    }

    pub fn enabled_display(&self) -> &'static str {
        if self.enabled {
            "enabled"
        } else {
            "disabled"
        }
    }
}
