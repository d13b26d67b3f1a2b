use serde::Deserialize;

/// Response envelope used by every Meater Cloud endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct MeaterEnvelope<T> {
    #[serde(default)]
    pub status: Option<String>,
    pub data: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeaterToken {
    pub token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeaterDeviceList {
    #[serde(default)]
    pub devices: Vec<MeaterDevice>,
}

/// One Meater probe. Temperatures are Celsius.
#[derive(Debug, Clone, Deserialize)]
pub struct MeaterDevice {
    pub id: String,
    pub temperature: MeaterTemperature,
    #[serde(default)]
    pub cook: Option<MeaterCook>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MeaterTemperature {
    pub internal: f64,
    pub ambient: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeaterCook {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}
