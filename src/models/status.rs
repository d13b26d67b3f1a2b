use serde::Deserialize;

/// One live controller reading as served by the status endpoint.
///
/// Every field is optional: older firmware omits anything it does not
/// track and the dashboard renders a placeholder instead of failing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusSnapshot {
    #[serde(default, alias = "current_temperature", alias = "temp")]
    pub temperature: Option<f64>,

    /// Per-probe readings; some revisions send only this array.
    #[serde(default)]
    pub temperatures: Option<Vec<f64>>,

    #[serde(default, alias = "target_temp")]
    pub target_temperature: Option<f64>,

    #[serde(default, alias = "fan", alias = "fan_state")]
    pub fan_on: Option<bool>,

    /// Fan duty cycle in percent, 0-100.
    #[serde(default)]
    pub fan_speed: Option<f64>,

    #[serde(default)]
    pub timestamp: Option<String>,
}

impl StatusSnapshot {
    /// The scalar reading, falling back to the head of the per-probe
    /// array for revisions that send only `temperatures[]`.
    pub fn current_temperature(&self) -> Option<f64> {
        self.temperature
            .or_else(|| self.temperatures.as_ref().and_then(|t| t.first().copied()))
    }

    pub fn fan_display(&self) -> String {
        match self.fan_on {
            Some(true) => "On".to_string(),
            Some(false) => "Off".to_string(),
            None => "--".to_string(),
        }
    }

    pub fn fan_speed_display(&self) -> String {
        match self.fan_speed {
            Some(speed) => format!("{:.0} %", speed),
            None => "--".to_string(),
        }
    }
}
