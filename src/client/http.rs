//! # MasterPi Controller HTTP API
//!
//! The controller backend is a small Flask app. Its routes drifted across
//! revisions, so reads that moved get a one-time 404 fallback and mutations
//! carry field/header spellings for both generations:
//!
//! | Operation          | Current                          | Legacy                        |
//! |--------------------|----------------------------------|-------------------------------|
//! | Status             | `GET /api/status`                | `GET /get_status`             |
//! | Current temp       | `GET /get_temperature`           | same                          |
//! | History            | `GET /get_temperature_data?minutes=N` | `GET /temp_data`         |
//! | Target temp        | `POST /set_target_temperature`   | `POST /update_target_temperature` |
//! | Settings read      | `GET /get_settings`              | same                          |
//! | Settings write     | `POST /save_settings` (form)     | split into `POST /save_device_settings` + `POST /save_personalization_settings` on newer backends |
//! | PID gains          | `POST /update_pid`               | same                          |
//! | Autotune           | `POST /pid_autotune` + `GET /autotune_status` | same             |
//! | Shutdown           | `POST /emergency_shutdown`       | same                          |
//! | DB init            | `POST /init_db`                  | same                          |
//! | Sensors            | `POST /add_sensor` / `/remove_sensor` / `/edit_sensor/{i}` | same |
//!
//! Mutating requests echo the CSRF token scraped from the dashboard page's
//! `<meta name="csrf-token">` tag as both `X-CSRFToken` and `X-CSRF-TOKEN`.
//! Responses signal application failure either as `{"success": false}` or
//! `{"status": "error"}`; both map to [`ClientError::Backend`].

use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

use crate::models::history::{is_history_payload, parse_history, HistoryPoint};
use crate::models::sensor::SensorConfig;
use crate::models::settings::{
    normalize_settings, AutotuneStatus, DeviceSettings, PidParams,
};
use crate::models::status::StatusSnapshot;
use crate::utils::meta::extract_csrf_token;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid base URL: {0}")]
    BaseUrl(#[from] url::ParseError),

    #[error("{endpoint} returned {status}: {body}")]
    UnexpectedStatus {
        endpoint: String,
        status: StatusCode,
        body: String,
    },

    #[error("could not decode {endpoint} response: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{endpoint} returned an unrecognized payload")]
    UnexpectedPayload { endpoint: String },

    #[error("backend rejected {endpoint}: {message}")]
    Backend { endpoint: String, message: String },

    #[error("autotune did not finish within {0:?}")]
    AutotuneTimeout(Duration),

    #[error("no Meater token, login first or set MEATER_JWT")]
    MissingToken,
}

pub struct PitmasterClient {
    http: Client,
    base: Url,
    csrf_token: Option<String>,
    legacy_status: AtomicBool,
    legacy_history: AtomicBool,
    legacy_target: AtomicBool,
    split_settings: AtomicBool,
}

impl PitmasterClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base = Url::parse(base_url)?;
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base,
            csrf_token: None,
            legacy_status: AtomicBool::new(false),
            legacy_history: AtomicBool::new(false),
            legacy_target: AtomicBool::new(false),
            split_settings: AtomicBool::new(false),
        })
    }

    /// Build a client and read the CSRF token off the dashboard page.
    /// Token failures are logged, not fatal: early backends have no token
    /// and accept bare mutations.
    pub async fn connect(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let mut client = Self::new(base_url, timeout)?;
        client.refresh_csrf_token().await;
        info!("connected to controller at {}", client.base);
        Ok(client)
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub async fn refresh_csrf_token(&mut self) {
        match self.fetch_page("/").await {
            Ok(html) => {
                self.csrf_token = extract_csrf_token(&html);
                match &self.csrf_token {
                    Some(_) => debug!("csrf token refreshed"),
                    None => info!("dashboard page has no csrf meta tag, mutating requests go bare"),
                }
            }
            Err(e) => warn!("could not fetch dashboard page for csrf token: {}", e),
        }
    }

    // ---- reads ----

    pub async fn fetch_status(&self) -> Result<StatusSnapshot, ClientError> {
        let value = self
            .get_with_fallback("/api/status", "/get_status", &self.legacy_status)
            .await?;
        decode("/api/status", value)
    }

    pub async fn fetch_current_temperature(&self) -> Result<f64, ClientError> {
        let value = self.get_value("/get_temperature").await?;
        value
            .as_f64()
            .or_else(|| value.get("temperature").and_then(Value::as_f64))
            .ok_or_else(|| ClientError::UnexpectedPayload {
                endpoint: "/get_temperature".to_string(),
            })
    }

    pub async fn fetch_history(&self, minutes: u32) -> Result<Vec<HistoryPoint>, ClientError> {
        let modern = format!("/get_temperature_data?minutes={}", minutes);
        let value = self
            .get_with_fallback(&modern, "/temp_data", &self.legacy_history)
            .await?;
        let points = parse_history(&value);
        // An empty recognized envelope means no readings; anything else
        // is not a history payload at all.
        if points.is_empty() && !is_history_payload(&value) {
            return Err(ClientError::UnexpectedPayload {
                endpoint: "/get_temperature_data".to_string(),
            });
        }
        Ok(points)
    }

    pub async fn fetch_settings(&self) -> Result<DeviceSettings, ClientError> {
        let value = self.get_value("/get_settings").await?;
        Ok(normalize_settings(&value))
    }

    pub async fn autotune_status(&self) -> Result<AutotuneStatus, ClientError> {
        let value = self.get_value("/autotune_status").await?;
        decode("/autotune_status", value)
    }

    // ---- mutations ----

    /// `value` is in the controller's configured unit.
    pub async fn set_target_temperature(&self, value: f64) -> Result<(), ClientError> {
        // Both field spellings so every backend revision finds its own.
        let body = json!({
            "target_temperature": value,
            "target_temp": value,
        });

        if !self.legacy_target.load(Ordering::Relaxed) {
            match self.post_json("/set_target_temperature", &body).await {
                Err(ClientError::UnexpectedStatus { status, .. })
                    if status == StatusCode::NOT_FOUND =>
                {
                    info!("/set_target_temperature not found, switching to /update_target_temperature");
                    self.legacy_target.store(true, Ordering::Relaxed);
                }
                other => return other.map(|_| ()),
            }
        }
        self.post_json("/update_target_temperature", &body)
            .await
            .map(|_| ())
    }

    pub async fn save_settings(&self, settings: &DeviceSettings) -> Result<(), ClientError> {
        if !self.split_settings.load(Ordering::Relaxed) {
            let form = settings_form(settings);
            match self.post_form("/save_settings", &form).await {
                Err(ClientError::UnexpectedStatus { status, .. })
                    if status == StatusCode::NOT_FOUND =>
                {
                    info!("/save_settings not found, switching to the split settings endpoints");
                    self.split_settings.store(true, Ordering::Relaxed);
                }
                other => return other.map(|_| ()),
            }
        }

        self.save_device_settings(settings).await?;
        if let Some(personalization) = &settings.personalization {
            self.save_personalization_settings(&personalization.chart_colours)
                .await?;
        }
        Ok(())
    }

    /// The device half of the split settings endpoints on newer backends.
    pub async fn save_device_settings(
        &self,
        settings: &DeviceSettings,
    ) -> Result<(), ClientError> {
        let form = settings_form(settings);
        self.post_form("/save_device_settings", &form)
            .await
            .map(|_| ())
    }

    /// The personalization half; repeated `chart_colours` form fields,
    /// read back by the backend with `getlist`.
    pub async fn save_personalization_settings(
        &self,
        chart_colours: &[String],
    ) -> Result<(), ClientError> {
        let form: Vec<(&str, String)> = chart_colours
            .iter()
            .map(|colour| ("chart_colours", colour.clone()))
            .collect();
        self.post_form("/save_personalization_settings", &form)
            .await
            .map(|_| ())
    }

    pub async fn update_pid(&self, params: &PidParams) -> Result<(), ClientError> {
        let body = serde_json::to_value(params).map_err(|source| ClientError::Decode {
            endpoint: "/update_pid".to_string(),
            source,
        })?;
        self.post_json("/update_pid", &body).await.map(|_| ())
    }

    pub async fn start_autotune(&self) -> Result<(), ClientError> {
        self.post_json("/pid_autotune", &json!({})).await.map(|_| ())
    }

    /// Poll `/autotune_status` until the backend reports gains.
    /// The dashboard polled on a 3 s cadence; callers pass their own.
    pub async fn wait_for_autotune(
        &self,
        poll_every: Duration,
        timeout: Duration,
    ) -> Result<PidParams, ClientError> {
        let deadline = Instant::now() + timeout;
        loop {
            let status = self.autotune_status().await?;
            if let Some(results) = status.results {
                info!(
                    "autotune finished: kp={} ki={} kd={}",
                    results.kp, results.ki, results.kd
                );
                return Ok(results);
            }
            if let Some(message) = &status.message {
                debug!("autotune pending: {}", message);
            }
            if Instant::now() >= deadline {
                return Err(ClientError::AutotuneTimeout(timeout));
            }
            tokio::time::sleep(poll_every).await;
        }
    }

    pub async fn emergency_shutdown(&self) -> Result<(), ClientError> {
        self.post_json("/emergency_shutdown", &json!({}))
            .await
            .map(|_| ())
    }

    pub async fn init_database(&self) -> Result<(), ClientError> {
        self.post_json("/init_db", &json!({})).await.map(|_| ())
    }

    pub async fn add_sensor(&self, sensor: &SensorConfig) -> Result<(), ClientError> {
        let body = serde_json::to_value(sensor).map_err(|source| ClientError::Decode {
            endpoint: "/add_sensor".to_string(),
            source,
        })?;
        self.post_json("/add_sensor", &body).await.map(|_| ())
    }

    pub async fn remove_sensor(&self, index: u32) -> Result<(), ClientError> {
        let body = json!({ "index": index });
        self.post_json("/remove_sensor", &body).await.map(|_| ())
    }

    pub async fn edit_sensor(&self, index: u32, sensor: &SensorConfig) -> Result<(), ClientError> {
        let path = format!("/edit_sensor/{}", index);
        let body = serde_json::to_value(sensor).map_err(|source| ClientError::Decode {
            endpoint: path.clone(),
            source,
        })?;
        self.post_json(&path, &body).await.map(|_| ())
    }

    // ---- transport ----

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base.join(path)?)
    }

    async fn fetch_page(&self, path: &str) -> Result<String, ClientError> {
        let response = self.http.get(self.url(path)?).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::UnexpectedStatus {
                endpoint: path.to_string(),
                status,
                body: snippet(&body),
            });
        }
        Ok(body)
    }

    async fn get_value(&self, path: &str) -> Result<Value, ClientError> {
        let started = Instant::now();
        let response = self.http.get(self.url(path)?).send().await?;
        let value = read_json(path, response).await?;
        debug!("GET {} took: {} ms", path, started.elapsed().as_millis());
        Ok(value)
    }

    /// GET `modern`, switching permanently to `legacy` after the first 404.
    async fn get_with_fallback(
        &self,
        modern: &str,
        legacy: &str,
        use_legacy: &AtomicBool,
    ) -> Result<Value, ClientError> {
        if !use_legacy.load(Ordering::Relaxed) {
            match self.get_value(modern).await {
                Err(ClientError::UnexpectedStatus { status, .. })
                    if status == StatusCode::NOT_FOUND =>
                {
                    info!("{} not found, switching to {}", modern, legacy);
                    use_legacy.store(true, Ordering::Relaxed);
                }
                other => return other,
            }
        }
        self.get_value(legacy).await
    }

    fn with_csrf(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.csrf_token {
            Some(token) => builder
                .header("X-CSRFToken", token)
                .header("X-CSRF-TOKEN", token),
            None => builder,
        }
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        let started = Instant::now();
        let request = self.with_csrf(self.http.post(self.url(path)?)).json(body);
        let response = request.send().await?;
        let value = read_json(path, response).await?;
        debug!("POST {} took: {} ms", path, started.elapsed().as_millis());
        ensure_ok(path, value)
    }

    async fn post_form<T: Serialize + ?Sized>(
        &self,
        path: &str,
        form: &T,
    ) -> Result<Value, ClientError> {
        let started = Instant::now();
        let request = self.with_csrf(self.http.post(self.url(path)?)).form(form);
        let response = request.send().await?;
        let value = read_json(path, response).await?;
        debug!("POST {} took: {} ms", path, started.elapsed().as_millis());
        ensure_ok(path, value)
    }
}

async fn read_json(endpoint: &str, response: Response) -> Result<Value, ClientError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ClientError::UnexpectedStatus {
            endpoint: endpoint.to_string(),
            status,
            body: snippet(&body),
        });
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|source| ClientError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

fn decode<T: DeserializeOwned>(endpoint: &str, value: Value) -> Result<T, ClientError> {
    serde_json::from_value(value).map_err(|source| ClientError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

/// Form pairs for `/save_settings`; only present fields are submitted,
/// mirroring the dashboard's FormData.
fn settings_form(settings: &DeviceSettings) -> Vec<(&'static str, String)> {
    let mut form = Vec::new();
    if let Some(name) = &settings.device_name {
        form.push(("device_name", name.clone()));
    }
    if let Some(offset) = settings.temp_offset {
        form.push(("temp_offset", offset.to_string()));
    }
    if let Some(unit) = settings.temp_unit {
        form.push(("temp_unit", unit.to_string()));
    }
    if let Some(timezone) = &settings.timezone {
        form.push(("timezone", timezone.clone()));
    }
    form
}

/// Accept `{"success": true}`, `{"status": "success"}`, and bodies with no
/// flag at all; only an explicit failure marker becomes an error.
fn ensure_ok(endpoint: &str, value: Value) -> Result<Value, ClientError> {
    if let Some(map) = value.as_object() {
        let message = || {
            map.get("message")
                .or_else(|| map.get("error"))
                .and_then(Value::as_str)
                .unwrap_or("request failed")
                .to_string()
        };
        if map.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(ClientError::Backend {
                endpoint: endpoint.to_string(),
                message: message(),
            });
        }
        if let Some(status) = map.get("status").and_then(Value::as_str) {
            if status.eq_ignore_ascii_case("error") {
                return Err(ClientError::Backend {
                    endpoint: endpoint.to_string(),
                    message: message(),
                });
            }
        }
    }
    Ok(value)
}

fn snippet(body: &str) -> String {
    const MAX: usize = 200;
    let trimmed = body.trim();
    if trimmed.len() <= MAX {
        return trimmed.to_string();
    }
    let mut end = MAX;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}
