use clap::Parser;
use env_logger::{Builder, WriteStyle};
use log::error;
use pitmon::cli::Cli;
use pitmon::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration first (without logging)
    let mut config = AppConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        // Fall back to default configuration
        AppConfig::default()
    });
    if let Some(base_url) = &cli.base_url {
        config.controller.base_url = base_url.clone();
    }

    // Initialise logger with a configured log level
    Builder::new()
        .filter_level(cli.log_level(&config))
        .write_style(WriteStyle::Always)
        .format_timestamp_secs()
        .init();

    if let Err(e) = pitmon::run(cli, config).await {
        error!("Application error: {}", e);
        return Err(e);
    }
    Ok(())
}
