pub mod cli;
pub mod client;
pub mod config;
pub mod models;

mod collectors;
mod dashboard;
mod renderer;
mod utils;

use crate::cli::{Cli, Command, MeaterAction, PidAction, SensorAction, SettingsAction};
use crate::client::{MeaterClient, PitmasterClient};
use crate::collectors::{DashboardState, PollOutcome};
use crate::config::{AppConfig, DEFAULT_CONFIG_FILE};
use crate::models::sensor::SensorConfig;
use crate::models::settings::{DeviceSettings, PidParams, SettingsUpdate};
use crate::models::units::TempUnit;
use crate::models::DashboardInfo;
use crate::renderer::colours::Palette;
use crate::renderer::fonts::FontSet;
use anyhow::{bail, Context};
use chrono::Local;
use log::{debug, error, info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    let Cli {
        command,
        config: config_path,
        ..
    } = cli;

    match command {
        Command::Watch => {
            info!("Starting watch loop");
            tokio::select! {
                result = watch_loop(&config) => {
                    match result {
                        Ok(_) => info!("Watch loop completed"),
                        Err(e) => {
                            error!("Application error: {e:#}");
                            // Print chain of error causes
                            let mut source = e.source();
                            while let Some(e) = source {
                                error!("Caused by: {e}");
                                source = e.source();
                            }
                            return Err(e).context("Application failed to run");
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, exiting");
                }
            }
            Ok(())
        }
        Command::Status => {
            let client = controller(&config).await?;
            run_status(&client, &config).await
        }
        Command::History { minutes } => {
            let client = controller(&config).await?;
            run_history(&client, &config, minutes).await
        }
        Command::Target { temperature, unit } => {
            let client = controller(&config).await?;
            run_target(&client, temperature, unit).await
        }
        Command::Settings { action } => {
            let client = controller(&config).await?;
            run_settings(&client, action).await
        }
        Command::Sensor { action } => {
            let client = controller(&config).await?;
            run_sensor(&client, action).await
        }
        Command::Pid { action } => {
            let client = controller(&config).await?;
            run_pid(&client, action).await
        }
        Command::Autotune { wait, timeout } => {
            let client = controller(&config).await?;
            run_autotune(&client, wait, timeout).await
        }
        Command::Shutdown { yes } => {
            let client = controller(&config).await?;
            run_shutdown(&client, yes).await
        }
        Command::InitDb => {
            let client = controller(&config).await?;
            client
                .init_database()
                .await
                .context("Database init failed")?;
            println!("History database initialised");
            Ok(())
        }
        Command::Meater { action } => run_meater(action, config_path.as_deref(), &config).await,
    }
}

/// The dashboard loop. Poll failures are logged and the previous state
/// stays on screen; only a broken configuration exits the loop.
async fn watch_loop(config: &AppConfig) -> anyhow::Result<()> {
    debug!("Connecting to {}", config.controller.base_url);
    let client = PitmasterClient::connect(&config.controller.base_url, config.timeout()).await?;

    let fonts = FontSet::load(config.dashboard.font.as_deref());
    if fonts.is_none() && config.dashboard.enabled {
        warn!("No usable font found, the dashboard will render without text");
    }

    let settings_every = u64::from(config.poll.settings_every.max(1));
    let mut state = DashboardState::new(config.poll.window_minutes, config.display_unit());
    let mut interval = tokio::time::interval(config.status_interval());
    let mut last_history: Option<Instant> = None;
    let mut ticks: u64 = 0;

    loop {
        interval.tick().await; // Wait for the next tick

        let include_history =
            last_history.map_or(true, |at| at.elapsed() >= config.history_interval());
        let include_settings = ticks % settings_every == 0;
        ticks += 1;

        debug!("Polling controller");
        let outcome = collectors::collect_cycle(
            &client,
            config.poll.window_minutes,
            include_history,
            include_settings,
        )
        .await;
        if outcome.history.is_some() {
            last_history = Some(Instant::now());
        }
        state.apply(outcome);

        let info = state.info();
        info!(
            "{} | current {} | target {} | fan {}",
            info.status_line, info.temperature_display, info.target_display, info.fan_display
        );

        if config.dashboard.enabled {
            let palette = match state.settings().personalization.as_ref() {
                Some(personalization) => Palette::with_overrides(&personalization.chart_colours),
                None => Palette::default(),
            };
            let img =
                dashboard::create_image(config, &info, state.window(), fonts.as_ref(), &palette);
            if let Err(e) = dashboard::save_image(config, &img) {
                error!("{}", e);
            }
        }
    }
}

async fn controller(config: &AppConfig) -> anyhow::Result<PitmasterClient> {
    PitmasterClient::connect(&config.controller.base_url, config.timeout())
        .await
        .context("Failed to create controller client")
}

async fn run_status(client: &PitmasterClient, config: &AppConfig) -> anyhow::Result<()> {
    let status = client.fetch_status().await.context("Status poll failed")?;
    // The unit comes from settings; missing settings just mean Celsius.
    let settings = match client.fetch_settings().await {
        Ok(settings) => Some(settings),
        Err(e) => {
            debug!("settings fetch failed: {}", e);
            None
        }
    };

    let mut state = DashboardState::new(config.poll.window_minutes, config.display_unit());
    state.apply(PollOutcome {
        status: Some(status),
        settings,
        ..Default::default()
    });
    print_info(&state.info());
    Ok(())
}

async fn run_history(
    client: &PitmasterClient,
    config: &AppConfig,
    minutes: u32,
) -> anyhow::Result<()> {
    let points = client
        .fetch_history(minutes)
        .await
        .context("History poll failed")?;
    if points.is_empty() {
        println!("No readings in the last {} minutes", minutes);
        return Ok(());
    }

    let source_unit = match client.fetch_settings().await {
        Ok(settings) => settings.unit(),
        Err(e) => {
            debug!("settings fetch failed, assuming Celsius: {}", e);
            TempUnit::Celsius
        }
    };
    let display = config.display_unit().unwrap_or(source_unit);

    let probes: BTreeSet<u32> = points.iter().map(|point| point.probe).collect();
    for point in &points {
        println!(
            "{}  probe {}  {}",
            point.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
            point.probe,
            display.format(source_unit.to_celsius(point.temperature))
        );
    }
    println!("{} readings across {} probe(s)", points.len(), probes.len());
    Ok(())
}

async fn run_target(
    client: &PitmasterClient,
    temperature: f64,
    unit: Option<TempUnit>,
) -> anyhow::Result<()> {
    match unit {
        None => {
            client
                .set_target_temperature(temperature)
                .await
                .context("Failed to set target temperature")?;
            println!("Target set to {:.2}", temperature);
        }
        Some(given) => {
            let controller_unit = client
                .fetch_settings()
                .await
                .context("Settings poll failed, cannot convert the target")?
                .unit();
            let value = if given == controller_unit {
                temperature
            } else {
                controller_unit.convert(given.to_celsius(temperature))
            };
            client
                .set_target_temperature(value)
                .await
                .context("Failed to set target temperature")?;
            println!("Target set to {:.2} {}", value, controller_unit.symbol());
        }
    }

    // The target is set at this point; a failed follow-up read is not fatal.
    match client.fetch_current_temperature().await {
        Ok(current) => println!("Current reading {:.2}", current),
        Err(e) => debug!("current temperature fetch failed: {}", e),
    }
    Ok(())
}

async fn run_settings(client: &PitmasterClient, action: SettingsAction) -> anyhow::Result<()> {
    match action {
        SettingsAction::Get => {
            let settings = client
                .fetch_settings()
                .await
                .context("Settings poll failed")?;
            print_settings(&settings);
            Ok(())
        }
        SettingsAction::Set(set) => {
            if set.is_empty() {
                bail!("Nothing to change, pass at least one --flag");
            }
            let mut settings = client
                .fetch_settings()
                .await
                .context("Settings poll failed")?;
            let update = SettingsUpdate {
                device_name: set.device_name,
                temp_offset: set.offset,
                temp_unit: set.unit,
                timezone: set.timezone,
            };
            update.apply_to(&mut settings);
            client
                .save_settings(&settings)
                .await
                .context("Failed to save settings")?;
            println!("Settings saved");
            print_settings(&settings);
            Ok(())
        }
    }
}

async fn run_sensor(client: &PitmasterClient, action: SensorAction) -> anyhow::Result<()> {
    match action {
        SensorAction::List => {
            let settings = client
                .fetch_settings()
                .await
                .context("Settings poll failed")?;
            if settings.sensors.is_empty() {
                println!("No sensors configured");
                return Ok(());
            }
            for (index, sensor) in settings.sensors.iter().enumerate() {
                println!(
                    "{:>2}  {:<18} {:<9} {:<12} {}",
                    index,
                    sensor.name,
                    sensor.kind.to_string(),
                    sensor.location_display(),
                    sensor.enabled_display()
                );
            }
            Ok(())
        }
        SensorAction::Add {
            name,
            kind,
            pin,
            address,
            channel,
            disabled,
        } => {
            let sensor = SensorConfig {
                id: None,
                name,
                kind,
                pin,
                address,
                channel,
                enabled: !disabled,
            };
            client
                .add_sensor(&sensor)
                .await
                .context("Failed to add sensor")?;
            println!("Sensor added");
            Ok(())
        }
        SensorAction::Edit {
            index,
            name,
            kind,
            pin,
            address,
            channel,
            enabled,
        } => {
            let settings = client
                .fetch_settings()
                .await
                .context("Settings poll failed")?;
            let mut sensor = settings
                .sensors
                .get(index as usize)
                .cloned()
                .with_context(|| {
                    format!("No sensor at index {}, run `pitmon sensor list`", index)
                })?;
            if let Some(name) = name {
                sensor.name = name;
            }
            if let Some(kind) = kind {
                sensor.kind = kind;
            }
            if let Some(pin) = pin {
                sensor.pin = Some(pin);
            }
            if let Some(address) = address {
                sensor.address = Some(address);
            }
            if let Some(channel) = channel {
                sensor.channel = Some(channel);
            }
            if let Some(enabled) = enabled {
                sensor.enabled = enabled;
            }
            client
                .edit_sensor(index, &sensor)
                .await
                .context("Failed to edit sensor")?;
            println!("Sensor {} updated", index);
            Ok(())
        }
        SensorAction::Remove { index } => {
            client
                .remove_sensor(index)
                .await
                .context("Failed to remove sensor")?;
            println!("Sensor {} removed", index);
            Ok(())
        }
    }
}

async fn run_pid(client: &PitmasterClient, action: PidAction) -> anyhow::Result<()> {
    match action {
        PidAction::Set { kp, ki, kd } => {
            let params = PidParams { kp, ki, kd };
            client
                .update_pid(&params)
                .await
                .context("Failed to update PID gains")?;
            println!("PID gains set to kp={} ki={} kd={}", kp, ki, kd);
            Ok(())
        }
    }
}

async fn run_autotune(client: &PitmasterClient, wait: bool, timeout: u64) -> anyhow::Result<()> {
    client
        .start_autotune()
        .await
        .context("Failed to start autotune")?;
    println!("Autotune started");

    if wait {
        println!("Waiting for results (up to {} s)", timeout);
        let gains = client
            .wait_for_autotune(Duration::from_secs(3), Duration::from_secs(timeout))
            .await
            .context("Autotune did not finish")?;
        println!("kp = {}", gains.kp);
        println!("ki = {}", gains.ki);
        println!("kd = {}", gains.kd);
    }
    Ok(())
}

async fn run_shutdown(client: &PitmasterClient, yes: bool) -> anyhow::Result<()> {
    if !yes {
        print!("Stop the fan and heater now? [y/N] ");
        io::stdout().flush().ok();
        let mut answer = String::new();
        io::stdin()
            .read_line(&mut answer)
            .context("Failed to read confirmation")?;
        let answer = answer.trim().to_lowercase();
        if answer != "y" && answer != "yes" {
            println!("Aborted");
            return Ok(());
        }
    }
    client
        .emergency_shutdown()
        .await
        .context("Shutdown request failed")?;
    println!("Emergency shutdown sent, fan and heater are stopping");
    Ok(())
}

async fn run_meater(
    action: MeaterAction,
    config_path: Option<&Path>,
    config: &AppConfig,
) -> anyhow::Result<()> {
    match action {
        MeaterAction::Login {
            email,
            password,
            save,
        } => {
            let mut client =
                MeaterClient::new(config.timeout()).context("Failed to create Meater client")?;
            let token = client
                .login(&email, &password)
                .await
                .context("Meater login failed")?;
            println!("{}", token);

            if save {
                let path = config_path
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
                let mut updated = config.clone();
                updated.meater.jwt = Some(token);
                updated.save(&path)?;
                println!("Token stored in {}", path.display());
            }
            Ok(())
        }
        MeaterAction::Temp => {
            let token = config
                .meater
                .jwt
                .clone()
                .or_else(|| std::env::var("MEATER_JWT").ok())
                .context("No Meater token, run `pitmon meater login` or set MEATER_JWT")?;
            let mut client =
                MeaterClient::new(config.timeout()).context("Failed to create Meater client")?;
            client.set_token(token);
            let reading = client
                .first_probe_temperature()
                .await
                .context("Meater poll failed")?;

            // The Meater cloud always reports Celsius.
            let unit = config.display_unit().unwrap_or(TempUnit::Celsius);
            println!("Internal: {}", unit.format(reading.internal));
            println!("Ambient:  {}", unit.format(reading.ambient));
            Ok(())
        }
    }
}

fn print_info(info: &DashboardInfo) {
    println!("Device:       {}", info.device_name);
    println!("Status:       {}", info.status_line);
    println!("Temperature:  {}", info.temperature_display);
    println!("Target:       {}", info.target_display);
    println!("Fan:          {}", fan_line(info));
    println!("Updated:      {}", info.updated_display);
}

fn print_settings(settings: &DeviceSettings) {
    println!("Device name:  {}", settings.device_name_display());
    println!("Unit:         {}", settings.unit().symbol());
    if let Some(offset) = settings.temp_offset {
        println!("Offset:       {:.2}", offset);
    }
    if let Some(target) = settings.target_temperature {
        println!("Target:       {:.2} {}", target, settings.unit().symbol());
    }
    if let Some(timezone) = &settings.timezone {
        println!("Timezone:     {}", timezone);
    }
    println!("Sensors:      {}", settings.sensors.len());
}

fn fan_line(info: &DashboardInfo) -> String {
    if info.fan_speed_display == "--" {
        info.fan_display.clone()
    } else {
        format!("{} ({})", info.fan_display, info.fan_speed_display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_line_without_speed() {
        let info = DashboardInfo::default();
        assert_eq!(fan_line(&info), "--");
    }

    #[test]
    fn test_fan_line_with_speed() {
        let info = DashboardInfo {
            fan_display: "On".to_string(),
            fan_speed_display: "64 %".to_string(),
            ..Default::default()
        };
        assert_eq!(fan_line(&info), "On (64 %)");
    }

    #[tokio::test]
    async fn test_controller_rejects_bad_url() {
        let mut config = AppConfig::default();
        config.controller.base_url = "not a url".to_string();
        assert!(controller(&config).await.is_err());
    }
}
