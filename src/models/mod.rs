pub mod history;
pub mod meater;
pub mod sensor;
pub mod settings;
pub mod status;
pub mod units;

use units::TempUnit;

/// Everything one render pass needs, with display strings precomputed
/// in the collector so renderers never format values themselves.
///
/// Raw values stay in the controller's configured unit (`source_unit`);
/// `unit` is what the user wants on screen. The two differ only when a
/// local display override is set.
#[derive(Debug, Clone)]
pub struct DashboardInfo {
    pub device_name: String,
    pub unit: TempUnit,
    pub source_unit: TempUnit,

    /// Raw values as reported, kept for chart scaling.
    pub temperature: Option<f64>,
    pub target: Option<f64>,
    pub fan_on: Option<bool>,
    pub fan_speed: Option<f64>,

    pub temperature_display: String,
    pub target_display: String,
    pub fan_display: String,
    pub fan_speed_display: String,

    pub online: bool,
    pub status_line: String,
    pub updated_display: String,
}

impl DashboardInfo {
    /// Convert a raw controller value into the display unit. Matching
    /// units pass the value through untouched.
    pub fn display_value(&self, raw: f64) -> f64 {
        if self.unit == self.source_unit {
            return raw;
        }
        self.unit.convert(self.source_unit.to_celsius(raw))
    }

    pub fn format_value(&self, raw: f64) -> String {
        format!("{:.2} {}", self.display_value(raw), self.unit.symbol())
    }
}

impl Default for DashboardInfo {
    fn default() -> Self {
        Self {
            device_name: "Smoker".to_string(),
            unit: TempUnit::Celsius,
            source_unit: TempUnit::Celsius,
            temperature: None,
            target: None,
            fan_on: None,
            fan_speed: None,
            temperature_display: "--".to_string(),
            target_display: "--".to_string(),
            fan_display: "--".to_string(),
            fan_speed_display: "--".to_string(),
            online: false,
            status_line: "Waiting for controller".to_string(),
            updated_display: "--".to_string(),
        }
    }
}
