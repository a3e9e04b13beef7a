//! `sockwatch dump` — Print one snapshot and exit.

use clap::{Args, ValueEnum};
use sockwatch_common::config::SourceMode;
use sockwatch_core::net::ConnectionRecord;
use sockwatch_core::users::UserNames;
use sockwatch_runtime::source::{DataSource, LiveSource};

use super::MonitorArgs;
use crate::output;

/// Arguments for the `dump` command.
#[derive(Args, Debug)]
pub struct DumpArgs {
    /// List every socket on the host instead of the target's.
    #[arg(short, long)]
    pub all: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = DumpFormat::Table)]
    pub format: DumpFormat,
}

/// Output encoding of `dump`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpFormat {
    /// Aligned columns.
    Table,
    /// The full sample as pretty-printed JSON.
    Json,
}

/// Executes the `dump` command.
///
/// # Errors
///
/// Returns an error if the target cannot be resolved or the collection
/// fails.
pub fn execute(args: &DumpArgs, monitor: &MonitorArgs) -> anyhow::Result<()> {
    let config = monitor.config(SourceMode::Live)?;
    let target = if args.all {
        None
    } else {
        Some(super::resolve(&config)?)
    };

    let mut source = LiveSource::new(&config.procfs_root, target);
    let Some(sample) = source.collect()? else {
        anyhow::bail!("no data collected from {}", config.procfs_root.display());
    };

    match args.format {
        DumpFormat::Json => println!("{}", serde_json::to_string_pretty(&sample)?),
        DumpFormat::Table => {
            let records: Vec<&ConnectionRecord> = if args.all {
                sample.snapshot.connections.iter().collect()
            } else {
                sample.snapshot.target_connections()
            };
            if records.is_empty() {
                println!("No sockets found.");
                return Ok(());
            }
            print!("{}", output::connection_table(&records, &mut UserNames::new()));
        }
    }
    Ok(())
}
