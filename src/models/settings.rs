use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::sensor::SensorConfig;
use crate::models::units::TempUnit;

/// Persistent controller settings as served by the settings endpoint.
///
/// The flat field names decode directly; older nested shapes
/// (`device.name`, `units.temperature`) and the `{"settings": {...}}`
/// envelope are handled by [`normalize_settings`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceSettings {
    #[serde(default, alias = "name")]
    pub device_name: Option<String>,

    /// Calibration offset applied to the pit probe, in the probe's unit.
    #[serde(default, alias = "offset")]
    pub temp_offset: Option<f64>,

    #[serde(default, alias = "unit")]
    pub temp_unit: Option<TempUnit>,

    #[serde(default, alias = "target_temp")]
    pub target_temperature: Option<f64>,

    #[serde(default)]
    pub timezone: Option<String>,

    #[serde(skip)]
    pub sensors: Vec<SensorConfig>,

    #[serde(skip)]
    pub personalization: Option<Personalization>,
}

impl DeviceSettings {
    pub fn device_name_display(&self) -> &str {
        self.device_name.as_deref().unwrap_or("Smoker")
    }

    pub fn unit(&self) -> TempUnit {
        self.temp_unit.unwrap_or_default()
    }
}

/// Dashboard colour overrides stored server-side.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Personalization {
    #[serde(
        default,
        alias = "colors",
        alias = "colours",
        alias = "chart_colors"
    )]
    pub chart_colours: Vec<String>,

    #[serde(default)]
    pub theme: Option<String>,
}

/// Decode a settings payload, tolerating the shapes produced across
/// backend revisions. Sensor entries that do not decode are skipped.
pub fn normalize_settings(value: &Value) -> DeviceSettings {
    let body = value.get("settings").unwrap_or(value);
    let mut settings: DeviceSettings =
        serde_json::from_value(body.clone()).unwrap_or_default();

    if settings.device_name.is_none() {
        settings.device_name = body
            .pointer("/device/name")
            .and_then(Value::as_str)
            .map(str::to_string);
    }
    if settings.temp_unit.is_none() {
        settings.temp_unit = body
            .pointer("/units/temperature")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok());
    }
    if settings.temp_offset.is_none() {
        settings.temp_offset = body
            .pointer("/device/temp_offset")
            .and_then(Value::as_f64);
    }
    if settings.timezone.is_none() {
        settings.timezone = body
            .pointer("/device/timezone")
            .and_then(Value::as_str)
            .map(str::to_string);
    }

    if let Some(entries) = body.get("sensors").and_then(Value::as_array) {
        settings.sensors = entries
            .iter()
            .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
            .collect();
    }
    settings.personalization = body
        .get("personalization")
        .or_else(|| body.get("colours"))
        .or_else(|| body.get("colors"))
        .and_then(|v| serde_json::from_value(v.clone()).ok());

    settings
}

/// Settings changes submitted back to the controller. The save endpoint
/// takes form fields, so absent values are left out entirely instead of
/// overwriting stored ones with blanks.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_offset: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_unit: Option<TempUnit>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.device_name.is_none()
            && self.temp_offset.is_none()
            && self.temp_unit.is_none()
            && self.timezone.is_none()
    }

    /// Fold these changes over a fetched settings record.
    pub fn apply_to(&self, settings: &mut DeviceSettings) {
        if let Some(name) = &self.device_name {
            settings.device_name = Some(name.clone());
        }
        if let Some(offset) = self.temp_offset {
            settings.temp_offset = Some(offset);
        }
        if let Some(unit) = self.temp_unit {
            settings.temp_unit = Some(unit);
        }
        if let Some(timezone) = &self.timezone {
            settings.timezone = Some(timezone.clone());
        }
    }
}

/// PID gains. Serialized lowercase for the update endpoint; autotune
/// results come back with capitalized keys.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidParams {
    #[serde(alias = "Kp")]
    pub kp: f64,
    #[serde(alias = "Ki")]
    pub ki: f64,
    #[serde(alias = "Kd")]
    pub kd: f64,
}

/// One autotune status poll. The run is finished once `results` appears;
/// until then the backend repeats a progress message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AutotuneStatus {
    #[serde(default)]
    pub results: Option<PidParams>,

    #[serde(default, alias = "error")]
    pub message: Option<String>,
}
