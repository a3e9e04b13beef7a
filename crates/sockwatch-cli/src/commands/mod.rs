//! CLI command definitions and dispatch.

pub mod dump;
pub mod record;
pub mod session;
pub mod top;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use sockwatch_common::config::{ErrorPolicy, MonitorConfig, SourceMode, TargetSelector};
use sockwatch_common::constants::{DEFAULT_PROCFS_ROOT, DEFAULT_REFRESH_PERIOD_MS};
use sockwatch_core::process::ProcessTable;
use sockwatch_runtime::source::resolve_target;

/// sockwatch — watch the kernel sockets of a process.
#[derive(Parser, Debug)]
#[command(name = "sockwatch", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Where to read socket data from.
    #[command(flatten)]
    pub monitor: MonitorArgs,

    /// Diagnostic log output.
    #[command(flatten)]
    pub log: LogArgs,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive dashboard of the target's sockets.
    Top(top::TopArgs),
    /// Record a session without the dashboard until interrupted.
    Record(record::RecordArgs),
    /// Print a single snapshot and exit.
    Dump(dump::DumpArgs),
    /// Work with recorded session files.
    Session(session::SessionArgs),
}

impl Command {
    /// Whether the command takes over the terminal.
    #[must_use]
    pub const fn is_interactive(&self) -> bool {
        matches!(self, Self::Top(_))
    }
}

/// Options shared by every command that reads procfs.
#[derive(Args, Debug, Clone)]
pub struct MonitorArgs {
    /// Root of the proc filesystem.
    #[arg(long, global = true, env = "SOCKWATCH_PROCFS", default_value = DEFAULT_PROCFS_ROOT)]
    pub procfs: PathBuf,

    /// Refresh period in milliseconds.
    #[arg(long, global = true, default_value_t = DEFAULT_REFRESH_PERIOD_MS)]
    pub period: u64,

    /// Monitor this process ID (defaults to sockwatch itself).
    #[arg(long, global = true, conflicts_with = "search")]
    pub pid: Option<u32>,

    /// Monitor the single process whose name contains this string.
    #[arg(long, global = true)]
    pub search: Option<String>,

    /// Log collection errors and keep sampling instead of exiting.
    #[arg(long, global = true)]
    pub skip_errors: bool,
}

impl MonitorArgs {
    /// Builds and validates the monitor configuration for `mode`.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting configuration is invalid.
    pub fn config(&self, mode: SourceMode) -> anyhow::Result<MonitorConfig> {
        let target = match (self.pid, &self.search) {
            (Some(pid), _) => TargetSelector::Pid(pid),
            (None, Some(name)) => TargetSelector::Search(name.clone()),
            (None, None) => TargetSelector::CurrentProcess,
        };
        let config = MonitorConfig {
            procfs_root: self.procfs.clone(),
            refresh_period_ms: self.period,
            target,
            mode,
            on_error: if self.skip_errors {
                ErrorPolicy::SkipTick
            } else {
                ErrorPolicy::Terminate
            },
            ..MonitorConfig::default()
        };
        config.validate()?;
        Ok(config)
    }
}

/// Resolves the configured target before monitoring starts.
///
/// # Errors
///
/// Returns an error if the search matches no process or several; the
/// message lists the candidates.
pub fn resolve(config: &MonitorConfig) -> anyhow::Result<u32> {
    let processes = ProcessTable::new(&config.procfs_root);
    let pid = resolve_target(&processes, &config.target)?;
    if !processes.exists(pid) {
        tracing::warn!(pid, "target process not visible under procfs root");
    }
    Ok(pid)
}

/// Log output encoding.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Logging options.
#[derive(Args, Debug, Clone)]
pub struct LogArgs {
    /// Write logs to this file (defaults to the data directory while the
    /// dashboard runs, stderr otherwise).
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Log line format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Top(args) => top::execute(args, &cli.monitor),
        Command::Record(args) => record::execute(args, &cli.monitor),
        Command::Dump(args) => dump::execute(&args, &cli.monitor),
        Command::Session(args) => session::execute(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("sockwatch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_follow_constants() {
        let cli = parse(&["dump"]);
        assert_eq!(cli.monitor.procfs, PathBuf::from("/proc"));
        assert_eq!(cli.monitor.period, 500);
        assert_eq!(cli.log.log_format, LogFormat::Text);
        let config = cli.monitor.config(SourceMode::Live).unwrap();
        assert_eq!(config.target, TargetSelector::CurrentProcess);
        assert_eq!(config.on_error, ErrorPolicy::Terminate);
    }

    #[test]
    fn target_flags_map_to_selectors() {
        let cli = parse(&["top", "--pid", "42"]);
        let config = cli.monitor.config(SourceMode::Live).unwrap();
        assert_eq!(config.target, TargetSelector::Pid(42));

        let cli = parse(&["--search", "nginx", "dump", "--skip-errors"]);
        let config = cli.monitor.config(SourceMode::Live).unwrap();
        assert_eq!(config.target, TargetSelector::Search("nginx".into()));
        assert_eq!(config.on_error, ErrorPolicy::SkipTick);
    }

    #[test]
    fn pid_and_search_conflict() {
        let result = Cli::try_parse_from(["sockwatch", "top", "--pid", "1", "--search", "x"]);
        assert!(result.is_err());
    }

    #[test]
    fn zero_period_is_rejected() {
        let cli = parse(&["dump", "--period", "0"]);
        assert!(cli.monitor.config(SourceMode::Live).is_err());
    }

    #[test]
    fn only_top_is_interactive() {
        assert!(parse(&["top"]).command.is_interactive());
        assert!(!parse(&["record", "out.swrec"]).command.is_interactive());
        assert!(!parse(&["session", "inspect", "out.swrec"]).command.is_interactive());
    }
}
