//! Monitor configuration model.
//!
//! Built once at start-up and handed to the scanner, the process table and
//! the sampler at construction time.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SockwatchError};

/// Root configuration for a monitoring session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Root of the proc filesystem to read tables from.
    pub procfs_root: PathBuf,
    /// Interval between two scheduled collections, in milliseconds.
    pub refresh_period_ms: u64,
    /// Which process the per-target view follows.
    pub target: TargetSelector,
    /// Where snapshots come from.
    pub mode: SourceMode,
    /// How a replayed session is paced.
    pub pacing: ReplayPacing,
    /// What the sampler does when a collection fails.
    pub on_error: ErrorPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            procfs_root: PathBuf::from(crate::constants::DEFAULT_PROCFS_ROOT),
            refresh_period_ms: crate::constants::DEFAULT_REFRESH_PERIOD_MS,
            target: TargetSelector::default(),
            mode: SourceMode::default(),
            pacing: ReplayPacing::default(),
            on_error: ErrorPolicy::default(),
        }
    }
}

impl MonitorConfig {
    /// Returns the refresh period as a [`Duration`].
    #[must_use]
    pub const fn refresh_period(&self) -> Duration {
        Duration::from_millis(self.refresh_period_ms)
    }

    /// Checks values that cannot be expressed by the types alone.
    ///
    /// # Errors
    ///
    /// Returns `SockwatchError::Config` for a zero refresh period, a zero
    /// PID or an empty search string.
    pub fn validate(&self) -> Result<()> {
        if self.refresh_period_ms == 0 {
            return Err(SockwatchError::Config {
                message: "refresh period must be greater than zero".into(),
            });
        }
        match &self.target {
            TargetSelector::Pid(0) => Err(SockwatchError::Config {
                message: "target PID must be greater than zero".into(),
            }),
            TargetSelector::Search(name) if name.is_empty() => Err(SockwatchError::Config {
                message: "search string must not be empty".into(),
            }),
            _ => Ok(()),
        }
    }
}

/// Selects the monitored process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSelector {
    /// The monitor's own process.
    #[default]
    CurrentProcess,
    /// An explicit PID.
    Pid(u32),
    /// The single process whose command name contains this substring.
    Search(String),
}

/// Origin of the snapshots delivered to consumers.
///
/// Recording and replaying are mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    /// Read the kernel tables on every tick.
    #[default]
    Live,
    /// Read the kernel tables and append every sample to this session file.
    Record(PathBuf),
    /// Play back this session file.
    Replay(PathBuf),
}

impl SourceMode {
    /// Builds the mode from the two optional CLI paths.
    ///
    /// # Errors
    ///
    /// Returns `SockwatchError::Config` if both paths are given.
    pub fn from_paths(record: Option<PathBuf>, replay: Option<PathBuf>) -> Result<Self> {
        match (record, replay) {
            (Some(_), Some(_)) => Err(SockwatchError::Config {
                message: "--record and --replay cannot be used together".into(),
            }),
            (Some(path), None) => Ok(Self::Record(path)),
            (None, Some(path)) => Ok(Self::Replay(path)),
            (None, None) => Ok(Self::Live),
        }
    }
}

/// Replay cadence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayPacing {
    /// One recorded entry per scheduler tick.
    #[default]
    PerTick,
    /// Wait the recorded delta between consecutive entries.
    Recorded,
}

/// Sampler behaviour when a collection cycle fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Surface the error and stop monitoring.
    #[default]
    Terminate,
    /// Log the error and wait for the next tick.
    SkipTick,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.refresh_period(), Duration::from_millis(500));
        assert_eq!(config.procfs_root, PathBuf::from("/proc"));
    }

    #[test]
    fn zero_period_is_rejected() {
        let config = MonitorConfig {
            refresh_period_ms: 0,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_pid_and_empty_search_are_rejected() {
        let mut config = MonitorConfig {
            target: TargetSelector::Pid(0),
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());
        config.target = TargetSelector::Search(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn record_and_replay_are_exclusive() {
        let both = SourceMode::from_paths(Some("a".into()), Some("b".into()));
        assert!(both.is_err());
        let replay = SourceMode::from_paths(None, Some("b".into())).unwrap();
        assert_eq!(replay, SourceMode::Replay("b".into()));
        assert_eq!(SourceMode::from_paths(None, None).unwrap(), SourceMode::Live);
    }

    #[test]
    fn config_serialization_roundtrip() {
        let config = MonitorConfig {
            mode: SourceMode::Record("/tmp/s.swrec".into()),
            pacing: ReplayPacing::Recorded,
            ..MonitorConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: MonitorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
