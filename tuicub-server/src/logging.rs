//! Global tracing setup for both server processes.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global subscriber: human-readable output on stderr filtered
/// by `RUST_LOG`, plus JSON lines appended to the configured logfile.
pub fn init(logfile_path: &str) -> Result<()> {
    let logfile = OpenOptions::new()
        .create(true)
        .append(true)
        .open(Path::new(logfile_path))
        .with_context(|| format!("Failed to open logfile {logfile_path}"))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tuicub=info,tuicubserver=info,tuicub_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(Mutex::new(logfile)),
        )
        .init();

    Ok(())
}
