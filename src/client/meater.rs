//! Meater Cloud client for the wireless probe readout.
//!
//! `POST /v1/login` trades email/password for a JWT; `GET /v1/devices`
//! lists paired probes with internal and ambient temperatures in Celsius.
//! The token can also arrive preissued via the `MEATER_JWT` environment
//! variable instead of a login call.

use log::{debug, info};
use reqwest::Client;
use serde_json::json;
use std::time::{Duration, Instant};
use url::Url;

use crate::client::http::ClientError;
use crate::models::meater::{
    MeaterDevice, MeaterDeviceList, MeaterEnvelope, MeaterTemperature, MeaterToken,
};

pub const MEATER_API_BASE: &str = "https://public-api.cloud.meater.com";

pub struct MeaterClient {
    http: Client,
    base: Url,
    token: Option<String>,
}

impl MeaterClient {
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        Self::with_base(MEATER_API_BASE, timeout)
    }

    pub fn with_base(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            base: Url::parse(base_url)?,
            token: None,
        })
    }

    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Exchange credentials for a JWT and keep it for later calls.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<String, ClientError> {
        let started = Instant::now();
        let url = self.base.join("/v1/login")?;
        let response = self
            .http
            .post(url)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let envelope: MeaterEnvelope<MeaterToken> =
            read_envelope("/v1/login", response).await?;
        let token = envelope
            .data
            .ok_or(ClientError::UnexpectedPayload {
                endpoint: "/v1/login".to_string(),
            })?
            .token;

        debug!("meater login took: {} ms", started.elapsed().as_millis());
        info!("meater login ok");
        self.token = Some(token.clone());
        Ok(token)
    }

    pub async fn devices(&self) -> Result<Vec<MeaterDevice>, ClientError> {
        let token = self.token.as_deref().ok_or(ClientError::MissingToken)?;
        let started = Instant::now();
        let url = self.base.join("/v1/devices")?;
        let response = self.http.get(url).bearer_auth(token).send().await?;

        let envelope: MeaterEnvelope<MeaterDeviceList> =
            read_envelope("/v1/devices", response).await?;
        debug!("meater devices took: {} ms", started.elapsed().as_millis());
        Ok(envelope.data.unwrap_or_default().devices)
    }

    /// Internal and ambient temperature of the first paired probe, the
    /// only one the dashboard ever surfaced.
    pub async fn first_probe_temperature(&self) -> Result<MeaterTemperature, ClientError> {
        let devices = self.devices().await?;
        devices
            .into_iter()
            .next()
            .map(|device| device.temperature)
            .ok_or(ClientError::Backend {
                endpoint: "/v1/devices".to_string(),
                message: "no Meater probes online".to_string(),
            })
    }
}

async fn read_envelope<T: serde::de::DeserializeOwned>(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<MeaterEnvelope<T>, ClientError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ClientError::UnexpectedStatus {
            endpoint: endpoint.to_string(),
            status,
            body: body.trim().to_string(),
        });
    }
    serde_json::from_str(&body).map_err(|source| ClientError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}
