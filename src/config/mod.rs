use anyhow::{Context, Result};
use config::{Config, File};
use log::{debug, info, LevelFilter};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::models::units::TempUnit;

pub const DEFAULT_CONFIG_FILE: &str = "pitmon.ini";

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_status_secs() -> u64 {
    3
}

fn default_history_secs() -> u64 {
    5
}

fn default_settings_every() -> u32 {
    10
}

fn default_window_minutes() -> u32 {
    120
}

fn default_dashboard_enabled() -> bool {
    true
}

fn default_dashboard_file() -> String {
    "pitmon.png".to_string()
}

fn default_dashboard_width() -> u32 {
    800
}

fn default_dashboard_height() -> u32 {
    480
}

fn default_unit() -> String {
    "auto".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ControllerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollConfig {
    #[serde(default = "default_status_secs")]
    pub status_secs: u64,
    #[serde(default = "default_history_secs")]
    pub history_secs: u64,
    /// Refresh settings every Nth status poll.
    #[serde(default = "default_settings_every")]
    pub settings_every: u32,
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            status_secs: default_status_secs(),
            history_secs: default_history_secs(),
            settings_every: default_settings_every(),
            window_minutes: default_window_minutes(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    #[serde(default = "default_dashboard_enabled")]
    pub enabled: bool,
    #[serde(default = "default_dashboard_file")]
    pub file: String,
    #[serde(default = "default_dashboard_width")]
    pub width: u32,
    #[serde(default = "default_dashboard_height")]
    pub height: u32,
    /// TTF path; when unset, well-known system locations are tried.
    #[serde(default)]
    pub font: Option<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: default_dashboard_enabled(),
            file: default_dashboard_file(),
            width: default_dashboard_width(),
            height: default_dashboard_height(),
            font: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    /// `auto` follows the controller's configured unit; `c`/`f` override.
    #[serde(default = "default_unit")]
    pub unit: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            unit: default_unit(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MeaterConfig {
    #[serde(default)]
    pub jwt: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(rename = "CONTROLLER", default)]
    pub controller: ControllerConfig,
    #[serde(rename = "POLL", default)]
    pub poll: PollConfig,
    #[serde(rename = "DASHBOARD", default)]
    pub dashboard: DashboardConfig,
    #[serde(rename = "DISPLAY", default)]
    pub display: DisplayConfig,
    #[serde(rename = "MEATER", default)]
    pub meater: MeaterConfig,
    #[serde(rename = "LOGGING", default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load an explicit path, or `pitmon.ini` when present, or defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    debug!("no {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_path = path.as_ref();
        debug!("Loading configuration from {}", config_path.display());

        let config = Config::builder()
            .add_source(
                File::with_name(config_path.to_str().unwrap_or(""))
                    .format(config::FileFormat::Ini),
            )
            .build()
            .context(format!(
                "Failed to load config from {}",
                config_path.display()
            ))?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize config")?;

        Ok(app_config)
    }

    pub fn get_log_level(&self) -> LevelFilter {
        match self.logging.level.to_lowercase().as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            "off" => LevelFilter::Off,
            _ => LevelFilter::Info, // Default to Info if invalid
        }
    }

    /// `None` means follow the controller's unit setting.
    pub fn display_unit(&self) -> Option<TempUnit> {
        match self.display.unit.trim().to_lowercase().as_str() {
            "auto" | "" => None,
            other => other.parse().ok(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.controller.timeout_secs.max(1))
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.poll.status_secs.clamp(1, 60))
    }

    pub fn history_interval(&self) -> Duration {
        Duration::from_secs(self.poll.history_secs.max(1))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config_path = path.as_ref();

        // Build the config string
        let mut config_str = String::new();

        config_str.push_str(&format!(
            "[CONTROLLER]\nbase_url = {}\ntimeout_secs = {}\n\n",
            self.controller.base_url, self.controller.timeout_secs
        ));

        config_str.push_str(&format!(
            "[POLL]\nstatus_secs = {}\nhistory_secs = {}\nsettings_every = {}\nwindow_minutes = {}\n\n",
            self.poll.status_secs,
            self.poll.history_secs,
            self.poll.settings_every,
            self.poll.window_minutes
        ));

        config_str.push_str(&format!(
            "[DASHBOARD]\nenabled = {}\nfile = {}\nwidth = {}\nheight = {}\n",
            self.dashboard.enabled,
            self.dashboard.file,
            self.dashboard.width,
            self.dashboard.height
        ));
        if let Some(font) = &self.dashboard.font {
            config_str.push_str(&format!("font = {}\n", font));
        }
        config_str.push('\n');

        config_str.push_str(&format!("[DISPLAY]\nunit = {}\n\n", self.display.unit));

        if let Some(jwt) = &self.meater.jwt {
            config_str.push_str(&format!("[MEATER]\njwt = {}\n\n", jwt));
        }

        config_str.push_str(&format!("[LOGGING]\nlevel = {}\n", self.logging.level));

        fs::write(config_path, config_str).context(format!(
            "Failed to save config to {}",
            config_path.display()
        ))?;

        info!("Configuration saved to {}", config_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.controller.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.controller.timeout_secs, 10);
        assert_eq!(config.poll.status_secs, 3);
        assert_eq!(config.poll.settings_every, 10);
        assert_eq!(config.poll.window_minutes, 120);
        assert_eq!(config.dashboard.enabled, true);
        assert_eq!(config.dashboard.file, "pitmon.png");
        assert_eq!(config.dashboard.width, 800);
        assert_eq!(config.dashboard.height, 480);
        assert_eq!(config.display.unit, "auto");
        assert!(config.display_unit().is_none());
        assert!(config.meater.jwt.is_none());
    }

    #[test]
    fn test_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let config_content = "[CONTROLLER]\nbase_url = http://smoker.local:5000\ntimeout_secs = 4\n\n[POLL]\nstatus_secs = 2\nhistory_secs = 8\nsettings_every = 5\nwindow_minutes = 60\n\n[DASHBOARD]\nenabled = false\nfile = out.png\nwidth = 480\nheight = 320\n\n[DISPLAY]\nunit = f\n\n[LOGGING]\nlevel = debug\n";

        temp_file.write_all(config_content.as_bytes()).unwrap();
        let config = AppConfig::from_file(temp_file.path()).unwrap();

        assert_eq!(config.controller.base_url, "http://smoker.local:5000");
        assert_eq!(config.controller.timeout_secs, 4);
        assert_eq!(config.poll.status_secs, 2);
        assert_eq!(config.poll.history_secs, 8);
        assert_eq!(config.poll.settings_every, 5);
        assert_eq!(config.poll.window_minutes, 60);
        assert_eq!(config.dashboard.enabled, false);
        assert_eq!(config.dashboard.file, "out.png");
        assert_eq!(config.display_unit(), Some(TempUnit::Fahrenheit));
        assert_eq!(config.get_log_level(), LevelFilter::Debug);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let config_content = "[CONTROLLER]\nbase_url = http://10.0.0.7:5000\n";

        temp_file.write_all(config_content.as_bytes()).unwrap();
        let config = AppConfig::from_file(temp_file.path()).unwrap();

        assert_eq!(config.controller.base_url, "http://10.0.0.7:5000");
        assert_eq!(config.controller.timeout_secs, 10);
        assert_eq!(config.poll.status_secs, 3);
        assert_eq!(config.dashboard.width, 800);
    }

    #[test]
    fn test_save_config() {
        let mut config = AppConfig::default();
        config.controller.base_url = "http://192.168.1.40:5000".to_string();
        config.poll.status_secs = 7;
        config.dashboard.file = "saved.png".to_string();
        config.dashboard.font = Some("/tmp/font.ttf".to_string());
        config.display.unit = "f".to_string();
        config.meater.jwt = Some("jwt-token".to_string());
        config.logging.level = "debug".to_string();

        let temp_file = NamedTempFile::new().unwrap();
        config.save(temp_file.path()).unwrap();

        let loaded = AppConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(loaded.controller.base_url, "http://192.168.1.40:5000");
        assert_eq!(loaded.poll.status_secs, 7);
        assert_eq!(loaded.dashboard.file, "saved.png");
        assert_eq!(loaded.dashboard.font.as_deref(), Some("/tmp/font.ttf"));
        assert_eq!(loaded.display.unit, "f");
        assert_eq!(loaded.meater.jwt.as_deref(), Some("jwt-token"));
        assert_eq!(loaded.logging.level, "debug");
    }

    #[test]
    fn test_status_interval_clamped() {
        let mut config = AppConfig::default();
        config.poll.status_secs = 0;
        assert_eq!(config.status_interval(), Duration::from_secs(1));
        config.poll.status_secs = 600;
        assert_eq!(config.status_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_load_missing_default_is_ok() {
        // explicit missing path errors, absent default file does not
        assert!(AppConfig::from_file("/definitely/not/here.ini").is_err());
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.poll.status_secs, 3);
    }
}
