//! Session files.
//!
//! A session is a JSON Lines file:
//!
//! ```text
//! {"header":{"format":"sockwatch-session","version":1,...}}
//! {"entry":{"timestamp":"...","snapshot":{...}}}
//! ...
//! {"trailer":{"entries":N}}
//! ```
//!
//! Entries are flushed as they are appended. The trailer is only written by
//! [`Recorder::close`], so a recording that was cut short is rejected by
//! [`Player::open`] instead of replaying silently truncated. A failed append
//! aborts the recorder for good: the trailer is never written after it.
//! Existing files are never overwritten.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sockwatch_common::constants::{SESSION_FORMAT, SESSION_VERSION};
use sockwatch_common::error::{Result, SockwatchError};
use uuid::Uuid;

use crate::snapshot::Sample;

/// First line of a session file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHeader {
    /// Always [`SESSION_FORMAT`].
    pub format: String,
    /// Format version.
    pub version: u32,
    /// Random identifier of this recording.
    pub id: Uuid,
    /// When recording started.
    pub created_at: DateTime<Utc>,
    /// Refresh period the session was recorded with.
    pub refresh_period_ms: u64,
    /// Monitored process, if any.
    pub target_pid: Option<u32>,
}

impl SessionHeader {
    /// Creates a header for a new recording.
    #[must_use]
    pub fn new(refresh_period_ms: u64, target_pid: Option<u32>) -> Self {
        Self {
            format: SESSION_FORMAT.to_string(),
            version: SESSION_VERSION,
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            refresh_period_ms,
            target_pid,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum LineOut<'a> {
    Header(&'a SessionHeader),
    Entry(&'a Sample),
    Trailer { entries: u64 },
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum LineIn {
    Header(SessionHeader),
    Entry(Sample),
    Trailer { entries: u64 },
}

/// Appends samples to a session file.
#[derive(Debug)]
pub struct Recorder {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    entries: u64,
    last: Option<DateTime<Utc>>,
    failure: Option<String>,
}

impl Recorder {
    /// Creates `path` and writes the header line.
    ///
    /// # Errors
    ///
    /// Returns an I/O error of kind `AlreadyExists` if `path` exists, and an
    /// I/O error if the file cannot be created or written.
    pub fn create(path: &Path, header: &SessionHeader) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| SockwatchError::io(path, e))?;
        let mut recorder = Self {
            path: path.to_path_buf(),
            writer: Some(BufWriter::new(file)),
            entries: 0,
            last: None,
            failure: None,
        };
        recorder.write_line(&LineOut::Header(header))?;
        tracing::info!(path = %path.display(), id = %header.id, "recording started");
        Ok(recorder)
    }

    /// Session file being written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries appended so far.
    #[must_use]
    pub const fn entries(&self) -> u64 {
        self.entries
    }

    /// Whether [`close`](Self::close) has run.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    /// Whether an earlier append failed.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        self.failure.is_some()
    }

    /// Appends one sample.
    ///
    /// Any failure aborts the recording: this and every later `append` or
    /// `close` returns `SockwatchError::RecordingAborted`.
    ///
    /// # Errors
    ///
    /// Returns `SockwatchError::SessionClosed` after [`close`](Self::close)
    /// and `SockwatchError::RecordingAborted` if the timestamp does not
    /// follow the previous entry's, the write fails, or a previous append
    /// failed.
    pub fn append(&mut self, sample: &Sample) -> Result<()> {
        self.check_aborted()?;
        if self.writer.is_none() {
            return Err(SockwatchError::SessionClosed {
                path: self.path.clone(),
            });
        }
        if let Some(last) = self.last.filter(|last| sample.timestamp <= *last) {
            return Err(self.abort(&SockwatchError::SessionOrder {
                previous: last.to_rfc3339(),
                next: sample.timestamp.to_rfc3339(),
            }));
        }
        if let Err(e) = self.write_line(&LineOut::Entry(sample)) {
            return Err(self.abort(&e));
        }
        self.entries += 1;
        self.last = Some(sample.timestamp);
        Ok(())
    }

    /// Writes the trailer and closes the file. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `SockwatchError::RecordingAborted` if an append failed, and
    /// an error if the trailer cannot be written or synced.
    pub fn close(&mut self) -> Result<()> {
        self.check_aborted()?;
        if self.writer.is_none() {
            return Ok(());
        }
        self.write_line(&LineOut::Trailer {
            entries: self.entries,
        })?;
        if let Some(writer) = self.writer.take() {
            let file = writer
                .into_inner()
                .map_err(|e| SockwatchError::io(&self.path, e.into_error()))?;
            file.sync_all()
                .map_err(|e| SockwatchError::io(&self.path, e))?;
        }
        tracing::info!(path = %self.path.display(), entries = self.entries, "recording closed");
        Ok(())
    }

    fn check_aborted(&self) -> Result<()> {
        match &self.failure {
            Some(reason) => Err(SockwatchError::RecordingAborted {
                path: self.path.clone(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn abort(&mut self, cause: &SockwatchError) -> SockwatchError {
        tracing::error!(path = %self.path.display(), error = %cause, "recording aborted");
        self.failure = Some(cause.to_string());
        SockwatchError::RecordingAborted {
            path: self.path.clone(),
            reason: cause.to_string(),
        }
    }

    fn write_line(&mut self, line: &LineOut<'_>) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(SockwatchError::SessionClosed {
                path: self.path.clone(),
            });
        };
        serde_json::to_writer(&mut *writer, line)?;
        writer
            .write_all(b"\n")
            .and_then(|()| writer.flush())
            .map_err(|e| SockwatchError::io(&self.path, e))
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if !self.is_closed() {
            tracing::warn!(
                path = %self.path.display(),
                "recorder dropped without close; session will not replay"
            );
        }
    }
}

/// Summary of a session file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Number of entries.
    pub entries: usize,
    /// Timestamp of the first entry.
    pub first: Option<DateTime<Utc>>,
    /// Timestamp of the last entry.
    pub last: Option<DateTime<Utc>>,
}

impl SessionSummary {
    /// Time covered by the recording.
    #[must_use]
    pub fn span(&self) -> Duration {
        match (self.first, self.last) {
            (Some(first), Some(last)) => (last - first).to_std().unwrap_or_default(),
            _ => Duration::ZERO,
        }
    }
}

/// Read-only cursor over a closed session.
#[derive(Debug, Clone)]
pub struct Player {
    path: PathBuf,
    header: SessionHeader,
    entries: Vec<Sample>,
    cursor: usize,
}

impl Player {
    /// Opens and validates a session file.
    ///
    /// The whole file is checked before the first entry is handed out.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, and
    /// `SockwatchError::InvalidSession` for a missing or foreign header, an
    /// undecodable line, out-of-order timestamps, a missing trailer, a
    /// trailer count that does not match, or data after the trailer.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| SockwatchError::io(path, e))?;
        let invalid = |reason: String| SockwatchError::InvalidSession {
            path: path.to_path_buf(),
            reason,
        };

        let mut header = None;
        let mut entries: Vec<Sample> = Vec::new();
        let mut trailer = None;

        for (index, line) in BufReader::new(file).lines().enumerate() {
            let lineno = index + 1;
            let line = line.map_err(|e| SockwatchError::io(path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            if trailer.is_some() {
                return Err(invalid(format!("line {lineno}: data after trailer")));
            }
            let parsed: LineIn = serde_json::from_str(&line)
                .map_err(|e| invalid(format!("line {lineno}: {e}")))?;
            match (parsed, header.is_some()) {
                (LineIn::Header(h), false) => {
                    if h.format != SESSION_FORMAT || h.version != SESSION_VERSION {
                        return Err(invalid(format!(
                            "unsupported format {} v{}",
                            h.format, h.version
                        )));
                    }
                    header = Some(h);
                }
                (_, false) => return Err(invalid("missing header".into())),
                (LineIn::Header(_), true) => {
                    return Err(invalid(format!("line {lineno}: second header")));
                }
                (LineIn::Entry(sample), true) => {
                    if let Some(prev) = entries.last().filter(|p| sample.timestamp <= p.timestamp) {
                        return Err(invalid(format!(
                            "line {lineno}: timestamp {} does not follow {}",
                            sample.timestamp.to_rfc3339(),
                            prev.timestamp.to_rfc3339()
                        )));
                    }
                    entries.push(sample);
                }
                (LineIn::Trailer { entries: count }, true) => trailer = Some(count),
            }
        }

        let header = header.ok_or_else(|| invalid("empty file".into()))?;
        match trailer {
            None => return Err(invalid("missing trailer; recording was not closed".into())),
            Some(count) if count != entries.len() as u64 => {
                return Err(invalid(format!(
                    "trailer announces {count} entries, found {}",
                    entries.len()
                )));
            }
            Some(_) => {}
        }

        tracing::info!(path = %path.display(), id = %header.id, entries = entries.len(), "session loaded");
        Ok(Self {
            path: path.to_path_buf(),
            header,
            entries,
            cursor: 0,
        })
    }

    /// Session file being played.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The session header.
    #[must_use]
    pub const fn header(&self) -> &SessionHeader {
        &self.header
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the session holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries already handed out.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.cursor
    }

    /// The entry the next call to `next` returns.
    #[must_use]
    pub fn peek(&self) -> Option<&Sample> {
        self.entries.get(self.cursor)
    }

    /// Recorded gap between the last entry handed out and the next one.
    ///
    /// `None` before the first entry and after the last.
    #[must_use]
    pub fn delay_to_next(&self) -> Option<Duration> {
        let previous = self.cursor.checked_sub(1).and_then(|i| self.entries.get(i))?;
        let next = self.peek()?;
        (next.timestamp - previous.timestamp).to_std().ok()
    }

    /// Moves the cursor back to the first entry.
    pub const fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Entry count and time range.
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            entries: self.entries.len(),
            first: self.entries.first().map(|s| s.timestamp),
            last: self.entries.last().map(|s| s.timestamp),
        }
    }
}

impl Iterator for Player {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        let sample = self.entries.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(sample)
    }
}
