//! `sockwatch session` — Inspect recorded session files.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use sockwatch_runtime::session::Player;

use crate::output;

/// Arguments for the `session` command.
#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Session action.
    #[command(subcommand)]
    pub action: SessionAction,
}

/// Session subcommands.
#[derive(Subcommand, Debug)]
pub enum SessionAction {
    /// Validate a session and print its header and time range.
    Inspect {
        /// Session file to read.
        file: PathBuf,
    },
}

/// Executes the `session` command.
///
/// # Errors
///
/// Returns an error if the session cannot be opened or fails validation.
pub fn execute(args: SessionArgs) -> anyhow::Result<()> {
    match args.action {
        SessionAction::Inspect { file } => inspect(&file),
    }
}

fn inspect(file: &std::path::Path) -> anyhow::Result<()> {
    let player = Player::open(file)?;
    let header = player.header();
    let summary = player.summary();

    println!("{:<14} {}", "File:", file.display());
    println!("{:<14} {}", "Session:", header.id);
    println!("{:<14} {} v{}", "Format:", header.format, header.version);
    println!("{:<14} {}", "Created:", header.created_at.to_rfc3339());
    println!("{:<14} {} ms", "Period:", header.refresh_period_ms);
    println!(
        "{:<14} {}",
        "Target:",
        header
            .target_pid
            .map_or_else(|| "-".to_string(), |pid| pid.to_string())
    );
    println!("{:<14} {}", "Entries:", summary.entries);
    if let (Some(first), Some(last)) = (summary.first, summary.last) {
        println!("{:<14} {}", "First:", first.to_rfc3339());
        println!("{:<14} {}", "Last:", last.to_rfc3339());
        println!("{:<14} {}", "Span:", output::format_duration(summary.span()));
    }
    Ok(())
}
