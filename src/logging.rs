//! Log output setup.
//!
//! The `--log` destination picks the writer; `--verbose` raises the default
//! level to DEBUG. `RUST_LOG`, when set, overrides the level entirely.

use anyhow::Result;
use std::fs::OpenOptions;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    Off,
    Stdout,
    Stderr,
    /// Append to a file, without ANSI colors.
    File(String),
}

impl LogDestination {
    /// Parse the `--log` argument: 0/off, 1/stdout, 2/stderr, or a filename.
    pub fn parse(value: &str) -> Self {
        match value {
            "0" | "off" => LogDestination::Off,
            "1" | "stdout" => LogDestination::Stdout,
            "2" | "stderr" => LogDestination::Stderr,
            filename => LogDestination::File(filename.to_string()),
        }
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Install the global subscriber.
pub fn init(destination: &LogDestination, verbose: bool) -> Result<()> {
    match destination {
        LogDestination::Off => {}
        LogDestination::Stdout => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(env_filter(verbose))
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogDestination::Stderr => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(env_filter(verbose))
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogDestination::File(filename) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(env_filter(verbose))
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}
