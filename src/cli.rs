use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::models::sensor::SensorKind;
use crate::models::units::TempUnit;

/// Console client for MasterPi smoker controllers.
#[derive(Debug, Parser)]
#[command(name = "pitmon", version, about)]
pub struct Cli {
    /// Config file (defaults to pitmon.ini in the working directory)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Controller base URL, overriding the config file
    #[arg(short = 'u', long, global = true, value_name = "URL", env = "PITMON_BASE_URL")]
    pub base_url: Option<String>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Effective log level: -v/-q win over the config file.
    pub fn log_level(&self, config: &AppConfig) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbose {
            0 => config.get_log_level(),
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the controller status once and print it
    Status,

    /// Poll the controller and keep the dashboard image up to date
    Watch,

    /// Print recent temperature history
    History {
        /// How far back to ask for, in minutes
        #[arg(long, default_value_t = 120)]
        minutes: u32,
    },

    /// Set the target temperature
    Target {
        /// New target, in the controller's unit unless --unit is given
        #[arg(allow_negative_numbers = true)]
        temperature: f64,

        /// Unit the value is given in; converted to the controller's unit
        #[arg(long, value_enum, ignore_case = true)]
        unit: Option<TempUnit>,
    },

    /// Read or change controller settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Manage probe sensors
    Sensor {
        #[command(subcommand)]
        action: SensorAction,
    },

    /// PID controller gains
    Pid {
        #[command(subcommand)]
        action: PidAction,
    },

    /// Start the PID autotune routine
    Autotune {
        /// Keep polling until the routine finishes and print the gains
        #[arg(long)]
        wait: bool,

        /// Give up waiting after this many seconds
        #[arg(long, default_value_t = 1800, value_name = "SECS")]
        timeout: u64,
    },

    /// Stop the fan and heater immediately
    Shutdown {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Initialise the controller's history database
    InitDb,

    /// Meater cloud probes
    Meater {
        #[command(subcommand)]
        action: MeaterAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    /// Print the current settings
    Get,

    /// Change settings; fields not given keep their current value
    Set(SettingsSet),
}

#[derive(Debug, Args, Default)]
pub struct SettingsSet {
    /// Rename the device
    #[arg(long, value_name = "NAME")]
    pub device_name: Option<String>,

    /// Probe calibration offset in degrees
    #[arg(long, value_name = "DEGREES", allow_negative_numbers = true)]
    pub offset: Option<f64>,

    /// Unit the controller reports in
    #[arg(long, value_enum, ignore_case = true)]
    pub unit: Option<TempUnit>,

    /// IANA timezone name, e.g. Europe/London
    #[arg(long, value_name = "TZ")]
    pub timezone: Option<String>,
}

impl SettingsSet {
    pub fn is_empty(&self) -> bool {
        self.device_name.is_none()
            && self.offset.is_none()
            && self.unit.is_none()
            && self.timezone.is_none()
    }
}

#[derive(Debug, Subcommand)]
pub enum PidAction {
    /// Replace all three gains at once
    Set {
        #[arg(long, allow_negative_numbers = true)]
        kp: f64,
        #[arg(long, allow_negative_numbers = true)]
        ki: f64,
        #[arg(long, allow_negative_numbers = true)]
        kd: f64,
    },
}

#[derive(Debug, Subcommand)]
pub enum SensorAction {
    /// List the configured sensors
    List,

    /// Add a sensor
    Add {
        /// Display name for the new probe
        name: String,

        #[arg(long, value_enum, ignore_case = true)]
        kind: SensorKind,

        /// SPI chip-select pin, for SPI sensor types
        #[arg(long)]
        pin: Option<u32>,

        /// I2C address, for I2C sensor types
        #[arg(long)]
        address: Option<String>,

        /// ADC channel, for ADS1115 sensors
        #[arg(long)]
        channel: Option<u8>,

        /// Add the sensor disabled
        #[arg(long)]
        disabled: bool,
    },

    /// Edit a sensor; fields not given keep their current value
    Edit {
        /// Sensor index as shown by `sensor list`
        index: u32,

        #[arg(long)]
        name: Option<String>,

        #[arg(long, value_enum, ignore_case = true)]
        kind: Option<SensorKind>,

        #[arg(long)]
        pin: Option<u32>,

        #[arg(long)]
        address: Option<String>,

        #[arg(long)]
        channel: Option<u8>,

        /// Enable or disable the sensor
        #[arg(long)]
        enabled: Option<bool>,
    },

    /// Remove a sensor
    Remove {
        /// Sensor index as shown by `sensor list`
        index: u32,
    },
}

#[derive(Debug, Subcommand)]
pub enum MeaterAction {
    /// Log in to the Meater cloud and print the API token
    Login {
        email: String,

        #[arg(long, env = "MEATER_PASSWORD", hide_env_values = true)]
        password: String,

        /// Store the token in the config file for later `meater temp` calls
        #[arg(long)]
        save: bool,
    },

    /// Print the first online probe's internal and ambient temperature
    Temp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_watch_with_overrides() {
        let cli = Cli::try_parse_from(["pitmon", "-v", "--base-url", "http://10.0.0.5:5000", "watch"])
            .unwrap();
        assert_eq!(cli.verbose, 1);
        assert_eq!(cli.base_url.as_deref(), Some("http://10.0.0.5:5000"));
        assert!(matches!(cli.command, Command::Watch));
    }

    #[test]
    fn test_parse_target_with_unit() {
        let cli = Cli::try_parse_from(["pitmon", "target", "225", "--unit", "F"]).unwrap();
        match cli.command {
            Command::Target { temperature, unit } => {
                assert_eq!(temperature, 225.0);
                assert_eq!(unit, Some(TempUnit::Fahrenheit));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_sensor_add() {
        let cli = Cli::try_parse_from([
            "pitmon", "sensor", "add", "Brisket", "--kind", "max31865", "--pin", "8",
        ])
        .unwrap();
        match cli.command {
            Command::Sensor {
                action: SensorAction::Add { name, kind, pin, .. },
            } => {
                assert_eq!(name, "Brisket");
                assert_eq!(kind, SensorKind::Max31865);
                assert_eq!(pin, Some(8));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_pid_set() {
        let cli = Cli::try_parse_from([
            "pitmon", "pid", "set", "--kp", "4.5", "--ki", "0.02", "--kd", "-1",
        ])
        .unwrap();
        match cli.command {
            Command::Pid {
                action: PidAction::Set { kp, ki, kd },
            } => {
                assert_eq!(kp, 4.5);
                assert_eq!(ki, 0.02);
                assert_eq!(kd, -1.0);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["pitmon", "-q", "-v", "status"]).is_err());
    }

    #[test]
    fn test_settings_set_empty_detection() {
        let cli = Cli::try_parse_from(["pitmon", "settings", "set"]).unwrap();
        match cli.command {
            Command::Settings {
                action: SettingsAction::Set(set),
            } => assert!(set.is_empty()),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_log_level_overrides() {
        let config = AppConfig::default();
        let quiet = Cli::try_parse_from(["pitmon", "-q", "status"]).unwrap();
        assert_eq!(quiet.log_level(&config), LevelFilter::Error);
        let loud = Cli::try_parse_from(["pitmon", "-vv", "status"]).unwrap();
        assert_eq!(loud.log_level(&config), LevelFilter::Trace);
        let plain = Cli::try_parse_from(["pitmon", "status"]).unwrap();
        assert_eq!(plain.log_level(&config), LevelFilter::Info);
    }
}
