//! Formatted output helpers for CLI commands.
//!
//! Provides the socket table printed by `dump`, human-readable durations
//! and session file naming.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use sockwatch_common::constants::SESSION_EXTENSION;
use sockwatch_core::net::ConnectionRecord;
use sockwatch_core::users::UserNames;

/// Formats a duration as `1h02m03s`, `2m05s`, `4.2s` or `350ms`.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h{:02}m{:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else if secs >= 1 {
        format!("{:.1}s", duration.as_millis() as f64 / 1000.0)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// Appends the session extension when `path` has none.
#[must_use]
pub fn session_path(path: PathBuf) -> PathBuf {
    if path.extension().is_some() {
        path
    } else {
        let mut name = path.into_os_string();
        name.push(SESSION_EXTENSION);
        PathBuf::from(name)
    }
}

/// Renders records as aligned columns, one per line, with a header.
#[must_use]
pub fn connection_table(records: &[&ConnectionRecord], users: &mut UserNames) -> String {
    let mut out = format!(
        "{:<8} {:<10} {:<12} {:<14} {}\n",
        "PROTO", "INODE", "USER", "INFO", "CONNECTION"
    );
    for record in records {
        let user = if record.local.is_some() {
            users.name(record.uid)
        } else {
            "-".to_string()
        };
        let _ = writeln!(
            out,
            "{:<8} {:<10} {:<12} {:<14} {record}",
            record.protocol.to_string(),
            record.inode,
            user,
            record.info(),
        );
    }
    out
}
