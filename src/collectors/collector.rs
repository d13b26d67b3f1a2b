use chrono::{DateTime, Local, Utc};
use log::debug;

use crate::client::PitmasterClient;
use crate::collectors::{history, settings, status};
use crate::models::history::{HistoryPoint, TempWindow};
use crate::models::settings::DeviceSettings;
use crate::models::status::StatusSnapshot;
use crate::models::units::TempUnit;
use crate::models::DashboardInfo;

/// Result of one fetch cycle. `None` means that source failed this
/// round; the previous value stays in effect.
#[derive(Debug, Default)]
pub struct PollOutcome {
    pub status: Option<StatusSnapshot>,
    pub history: Option<Vec<HistoryPoint>>,
    pub settings: Option<DeviceSettings>,
}

/// Fetch the sources due this tick concurrently. Status goes every
/// round; history and settings follow their own slower cadences.
pub async fn collect_cycle(
    client: &PitmasterClient,
    window_minutes: u32,
    include_history: bool,
    include_settings: bool,
) -> PollOutcome {
    let status_fut = status::collect_status(client);
    let history_fut = async {
        if include_history {
            history::collect_history(client, window_minutes).await
        } else {
            None
        }
    };
    let settings_fut = async {
        if include_settings {
            settings::collect_settings(client).await
        } else {
            None
        }
    };

    let (status, history, settings) = tokio::join!(status_fut, history_fut, settings_fut);
    PollOutcome {
        status,
        history,
        settings,
    }
}

/// Rolling dashboard state owned by the watch loop. A failed poll
/// leaves every previous value visible; only `online` flips.
#[derive(Debug)]
pub struct DashboardState {
    unit_override: Option<TempUnit>,
    settings: DeviceSettings,
    status: Option<StatusSnapshot>,
    window: TempWindow,
    online: bool,
    last_update: Option<DateTime<Utc>>,
}

impl DashboardState {
    pub fn new(window_minutes: u32, unit_override: Option<TempUnit>) -> Self {
        Self {
            unit_override,
            settings: DeviceSettings::default(),
            status: None,
            window: TempWindow::new(window_minutes),
            online: false,
            last_update: None,
        }
    }

    pub fn apply(&mut self, outcome: PollOutcome) {
        self.apply_at(outcome, Utc::now());
    }

    pub fn apply_at(&mut self, outcome: PollOutcome, now: DateTime<Utc>) {
        if let Some(settings) = outcome.settings {
            self.settings = settings;
        }
        if let Some(points) = outcome.history {
            let merged = self.window.merge(&points);
            debug!("merged {} new history points", merged);
        }
        match outcome.status {
            Some(status) => {
                if let Some(temperature) = status.current_temperature() {
                    self.window.push_live(now, temperature);
                }
                self.status = Some(status);
                self.online = true;
                self.last_update = Some(now);
            }
            None => self.online = false,
        }
        self.window.prune(now);
    }

    pub fn settings(&self) -> &DeviceSettings {
        &self.settings
    }

    pub fn window(&self) -> &TempWindow {
        &self.window
    }

    /// Unit controller values arrive in.
    pub fn source_unit(&self) -> TempUnit {
        self.settings.unit()
    }

    /// Unit shown on screen: local override, else the controller's.
    pub fn display_unit(&self) -> TempUnit {
        self.unit_override.unwrap_or_else(|| self.settings.unit())
    }

    pub fn info(&self) -> DashboardInfo {
        let unit = self.display_unit();
        let source_unit = self.source_unit();
        let status = self.status.as_ref();

        let temperature = status.and_then(StatusSnapshot::current_temperature);
        let target = status
            .and_then(|s| s.target_temperature)
            .or(self.settings.target_temperature);

        let mut info = DashboardInfo {
            device_name: self.settings.device_name_display().to_string(),
            unit,
            source_unit,
            temperature,
            target,
            fan_on: status.and_then(|s| s.fan_on),
            fan_speed: status.and_then(|s| s.fan_speed),
            fan_display: status
                .map(StatusSnapshot::fan_display)
                .unwrap_or_else(|| "--".to_string()),
            fan_speed_display: status
                .map(StatusSnapshot::fan_speed_display)
                .unwrap_or_else(|| "--".to_string()),
            online: self.online,
            status_line: if self.online {
                "Connected".to_string()
            } else if self.status.is_some() {
                "Controller unreachable, showing last reading".to_string()
            } else {
                "Waiting for controller".to_string()
            },
            updated_display: self
                .last_update
                .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "--".to_string()),
            ..Default::default()
        };

        if let Some(value) = temperature {
            info.temperature_display = info.format_value(value);
        }
        if let Some(value) = target {
            info.target_display = info.format_value(value);
        }
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn status(temperature: f64, fan_on: bool) -> StatusSnapshot {
        StatusSnapshot {
            temperature: Some(temperature),
            temperatures: None,
            target_temperature: Some(110.0),
            fan_on: Some(fan_on),
            fan_speed: Some(40.0),
            timestamp: None,
        }
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 4, 18, minute, 0).unwrap()
    }

    #[test]
    fn test_successful_poll_fills_display() {
        let mut state = DashboardState::new(120, None);
        state.apply_at(
            PollOutcome {
                status: Some(status(95.5, true)),
                history: None,
                settings: None,
            },
            at(0),
        );

        let info = state.info();
        assert!(info.online);
        assert_eq!(info.temperature_display, "95.50 °C");
        assert_eq!(info.target_display, "110.00 °C");
        assert_eq!(info.fan_display, "On");
        assert_eq!(info.status_line, "Connected");
        // live reading lands in the chart window
        assert_eq!(state.window().latest(0).unwrap().1, 95.5);
    }

    #[test]
    fn test_unit_follows_controller_settings() {
        let mut state = DashboardState::new(120, None);
        let settings: DeviceSettings =
            serde_json::from_str(r#"{"device_name": "Pit", "temp_unit": "F"}"#).unwrap();
        state.apply_at(
            PollOutcome {
                status: Some(status(95.5, true)),
                history: None,
                settings: Some(settings),
            },
            at(0),
        );

        let info = state.info();
        assert_eq!(info.device_name, "Pit");
        // controller reports in its own unit; no conversion applied
        assert_eq!(info.temperature_display, "95.50 °F");
    }

    #[test]
    fn test_display_override_converts() {
        let mut state = DashboardState::new(120, Some(TempUnit::Fahrenheit));
        state.apply_at(
            PollOutcome {
                status: Some(status(35.0, false)),
                history: None,
                settings: None,
            },
            at(0),
        );

        let info = state.info();
        assert_eq!(info.temperature_display, "95.00 °F");
        assert_eq!(info.fan_display, "Off");
    }

    #[test]
    fn test_failed_poll_retains_previous_values() {
        let mut state = DashboardState::new(120, None);
        state.apply_at(
            PollOutcome {
                status: Some(status(95.5, true)),
                history: None,
                settings: None,
            },
            at(0),
        );
        state.apply_at(PollOutcome::default(), at(1));

        let info = state.info();
        assert!(!info.online);
        assert_eq!(info.temperature_display, "95.50 °C");
        assert_eq!(info.fan_display, "On");
        assert_eq!(info.status_line, "Controller unreachable, showing last reading");
    }

    #[test]
    fn test_history_merges_into_window() {
        let mut state = DashboardState::new(120, None);
        let points = vec![
            HistoryPoint {
                probe: 0,
                timestamp: at(0),
                temperature: 90.0,
            },
            HistoryPoint {
                probe: 0,
                timestamp: at(1),
                temperature: 91.0,
            },
        ];
        state.apply_at(
            PollOutcome {
                status: None,
                history: Some(points.clone()),
                settings: None,
            },
            at(2),
        );
        // same page again adds nothing
        state.apply_at(
            PollOutcome {
                status: None,
                history: Some(points),
                settings: None,
            },
            at(3),
        );
        assert_eq!(state.window().len(), 2);
    }

    #[test]
    fn test_never_polled_shows_placeholders() {
        let state = DashboardState::new(120, None);
        let info = state.info();
        assert_eq!(info.temperature_display, "--");
        assert_eq!(info.status_line, "Waiting for controller");
        assert_eq!(info.updated_display, "--");
    }
}
