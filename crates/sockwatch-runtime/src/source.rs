//! Data sources feeding the sampler.
//!
//! Live, recording and replay sources sit behind [`DataSource`]. Exactly one
//! is active for the lifetime of a sampler; recording and replay never run
//! together.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use sockwatch_common::config::{MonitorConfig, ReplayPacing, SourceMode, TargetSelector};
use sockwatch_common::error::Result;
use sockwatch_common::types::Protocol;
use sockwatch_core::net::{IndexBuilder, TableScanner};
use sockwatch_core::process::ProcessTable;

use crate::session::{Player, Recorder, SessionHeader};
use crate::snapshot::{Sample, Snapshot, TargetSockets};

/// What kind of source is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Reading the kernel tables.
    Live,
    /// Reading the kernel tables and writing a session file.
    Recording,
    /// Playing back a session file.
    Replay,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Live => "live",
            Self::Recording => "recording",
            Self::Replay => "replay",
        };
        f.write_str(label)
    }
}

/// Produces one sample per collection cycle.
pub trait DataSource: Send {
    /// Which kind of source this is.
    fn kind(&self) -> SourceKind;

    /// Runs one collection cycle.
    ///
    /// Returns `Ok(None)` once the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns the error that aborted the cycle. No partial sample is
    /// produced.
    fn collect(&mut self) -> Result<Option<Sample>>;

    /// Delay the source wants before its next collection, overriding the
    /// fixed tick period.
    fn next_delay(&self) -> Option<Duration> {
        None
    }

    /// Releases the source's resources.
    ///
    /// # Errors
    ///
    /// Returns an error if finalizing fails.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Reads a fresh snapshot from procfs on every collection.
#[derive(Debug)]
pub struct LiveSource {
    builder: IndexBuilder,
    processes: ProcessTable,
    target: Option<u32>,
    last: Option<DateTime<Utc>>,
}

impl LiveSource {
    /// Creates a live source over the procfs mounted at `root`.
    ///
    /// Families whose table is absent are reported once and left out of
    /// every later scan.
    pub fn new(root: impl Into<PathBuf>, target: Option<u32>) -> Self {
        let root = root.into();
        let builder = IndexBuilder::new(TableScanner::new(&root));
        let available = builder.available_families();
        for missing in Protocol::ALL.iter().filter(|p| !available.contains(*p)) {
            tracing::warn!(
                root = %root.display(),
                family = %missing,
                "socket table not found, family disabled"
            );
        }
        Self {
            builder: builder.with_families(available),
            processes: ProcessTable::new(root),
            target,
            last: None,
        }
    }

    /// Families scanned on each collection.
    #[must_use]
    pub fn families(&self) -> &[Protocol] {
        self.builder.families()
    }

    /// The monitored process, if any.
    #[must_use]
    pub const fn target(&self) -> Option<u32> {
        self.target
    }

    fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let timestamp = match self.last {
            Some(last) if now <= last => last + TimeDelta::nanoseconds(1),
            _ => now,
        };
        self.last = Some(timestamp);
        timestamp
    }
}

impl DataSource for LiveSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Live
    }

    fn collect(&mut self) -> Result<Option<Sample>> {
        let connections = self.builder.build()?;
        let mut snapshot = Snapshot::new(connections);
        if let Some(pid) = self.target {
            snapshot.target = Some(TargetSockets {
                pid,
                inodes: self.processes.socket_inodes(pid)?,
            });
        }
        Ok(Some(Sample {
            timestamp: self.stamp(),
            snapshot,
        }))
    }
}

/// Wraps another source and appends every sample to a session file.
#[derive(Debug)]
pub struct RecordingSource<S> {
    inner: S,
    recorder: Recorder,
}

impl<S: DataSource> RecordingSource<S> {
    /// Starts a new recording at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session file cannot be created.
    pub fn create(inner: S, path: &Path, header: &SessionHeader) -> Result<Self> {
        let recorder = Recorder::create(path, header)?;
        Ok(Self { inner, recorder })
    }

    /// The recorder receiving the samples.
    #[must_use]
    pub const fn recorder(&self) -> &Recorder {
        &self.recorder
    }
}

impl<S: DataSource> DataSource for RecordingSource<S> {
    fn kind(&self) -> SourceKind {
        SourceKind::Recording
    }

    fn collect(&mut self) -> Result<Option<Sample>> {
        let Some(sample) = self.inner.collect()? else {
            return Ok(None);
        };
        self.recorder.append(&sample)?;
        Ok(Some(sample))
    }

    fn next_delay(&self) -> Option<Duration> {
        self.inner.next_delay()
    }

    fn finish(&mut self) -> Result<()> {
        self.inner.finish()?;
        self.recorder.close()
    }
}

/// Plays back a recorded session.
#[derive(Debug)]
pub struct ReplaySource {
    player: Player,
    pacing: ReplayPacing,
}

impl ReplaySource {
    /// Opens the session at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be opened or fails validation.
    pub fn open(path: &Path, pacing: ReplayPacing) -> Result<Self> {
        Ok(Self::new(Player::open(path)?, pacing))
    }

    /// Wraps an already opened player.
    #[must_use]
    pub const fn new(player: Player, pacing: ReplayPacing) -> Self {
        Self { player, pacing }
    }

    /// The underlying player.
    #[must_use]
    pub const fn player(&self) -> &Player {
        &self.player
    }
}

impl DataSource for ReplaySource {
    fn kind(&self) -> SourceKind {
        SourceKind::Replay
    }

    fn collect(&mut self) -> Result<Option<Sample>> {
        let sample = self.player.next();
        if sample.is_none() {
            tracing::debug!(path = %self.player.path().display(), "session exhausted");
        }
        Ok(sample)
    }

    fn next_delay(&self) -> Option<Duration> {
        match self.pacing {
            ReplayPacing::PerTick => None,
            ReplayPacing::Recorded => self.player.delay_to_next(),
        }
    }
}

/// Resolves the configured target to a PID.
///
/// # Errors
///
/// Returns `SockwatchError::NoSuchTarget` or
/// `SockwatchError::AmbiguousTarget` when a search does not name exactly
/// one process, and an I/O error if the process list cannot be read.
pub fn resolve_target(processes: &ProcessTable, selector: &TargetSelector) -> Result<u32> {
    match selector {
        TargetSelector::CurrentProcess => Ok(std::process::id()),
        TargetSelector::Pid(pid) => Ok(*pid),
        TargetSelector::Search(name) => processes.search(name),
    }
}

/// Builds the source selected by `config.mode`.
///
/// `target` is ignored in replay mode; the recorded snapshots carry their
/// own target.
///
/// # Errors
///
/// Returns an error if the session file cannot be created or opened.
pub fn build_source(config: &MonitorConfig, target: Option<u32>) -> Result<Box<dyn DataSource>> {
    let source: Box<dyn DataSource> = match &config.mode {
        SourceMode::Live => Box::new(LiveSource::new(&config.procfs_root, target)),
        SourceMode::Record(path) => {
            let header = SessionHeader::new(config.refresh_period_ms, target);
            let live = LiveSource::new(&config.procfs_root, target);
            Box::new(RecordingSource::create(live, path, &header)?)
        }
        SourceMode::Replay(path) => Box::new(ReplaySource::open(path, config.pacing)?),
    };
    tracing::info!(kind = %source.kind(), "data source ready");
    Ok(source)
}
