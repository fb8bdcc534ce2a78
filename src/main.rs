//! Oculus: Eye screening diagnosis from the command line.

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use oculus::adapters::sanitize::SanitizingMakeWriter;
use oculus::cli::{self, Cli};
use oculus::config::{LogMode, OculusConfig};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = OculusConfig::from_env_or_default();

    // Logs share the terminal with the colour test prompts, so an
    // interactive session logs to a file unless told otherwise.
    let use_file = match config.log_mode {
        LogMode::File => true,
        LogMode::Stderr => false,
        LogMode::Auto => std::io::stderr().is_terminal(),
    };

    let (writer, _guard) = if use_file {
        if let Some(parent) = config.log_file.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stderr())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(!use_file)
                .with_writer(SanitizingMakeWriter::new(writer)),
        )
        .init();

    // Config warnings above were emitted before the subscriber existed.
    let config = cli.apply(OculusConfig::from_env_or_default());
    tracing::info!("Starting Oculus against {}", config.api_url);

    cli::run(&cli, &config)?;

    tracing::debug!("Oculus finished.");
    Ok(())
}
