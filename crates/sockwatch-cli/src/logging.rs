//! Diagnostic log set-up.
//!
//! The dashboard owns the terminal, so while it runs logs go to a file.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use sockwatch_common::constants::default_log_file;
use tracing_subscriber::EnvFilter;

use crate::commands::{LogArgs, LogFormat};

/// Installs the global subscriber.
///
/// `RUST_LOG` selects the filter, `info` when unset.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened.
pub fn init(args: &LogArgs, interactive: bool) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let destination = log_destination(args.log_file.clone(), interactive);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match (destination, args.log_format) {
        (Some(path), LogFormat::Text) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(open_log(&path)?))
            .init(),
        (Some(path), LogFormat::Json) => builder
            .json()
            .with_writer(Mutex::new(open_log(&path)?))
            .init(),
        (None, LogFormat::Text) => builder.with_writer(std::io::stderr).init(),
        (None, LogFormat::Json) => builder.json().with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn log_destination(explicit: Option<PathBuf>, interactive: bool) -> Option<PathBuf> {
    explicit.or_else(|| interactive.then(default_log_file))
}

fn open_log(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| anyhow::anyhow!("cannot open log file {}: {e}", path.display()))
}
