//! Unified error types for the sockwatch workspace.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{ProcessMatch, Protocol};

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum SockwatchError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A socket table line could not be decoded.
    ///
    /// Aborts the whole scan of the table it came from.
    #[error("could not parse {protocol} line from {path} ({reason}): {line}")]
    MalformedLine {
        /// Table file the line was read from.
        path: PathBuf,
        /// Family the line was decoded as.
        protocol: Protocol,
        /// The offending line, whitespace-normalized.
        line: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A stored connection list names the same inode twice.
    #[error("inode {inode} appears more than once in a snapshot")]
    DuplicateInode {
        /// The repeated inode.
        inode: u64,
    },

    /// No process matched a name search.
    #[error("no matches for '{name}'")]
    NoSuchTarget {
        /// The searched substring.
        name: String,
    },

    /// Several processes matched a name search.
    #[error("multiple matches for '{name}':\n{}", list_matches(.matches))]
    AmbiguousTarget {
        /// The searched substring.
        name: String,
        /// Every match, sorted by PID.
        matches: Vec<ProcessMatch>,
    },

    /// A session file is missing pieces or contains undecodable data.
    #[error("invalid session file {path}: {reason}")]
    InvalidSession {
        /// Session file path.
        path: PathBuf,
        /// Description of the structural problem.
        reason: String,
    },

    /// A session entry was appended out of timestamp order.
    #[error("session entries must have increasing timestamps: {next} does not follow {previous}")]
    SessionOrder {
        /// Timestamp of the last appended entry.
        previous: String,
        /// Timestamp that was rejected.
        next: String,
    },

    /// A write was attempted on a session that has already been closed.
    #[error("session {path} is closed")]
    SessionClosed {
        /// Session file path.
        path: PathBuf,
    },

    /// An append to a session failed; the recording cannot continue.
    ///
    /// Never downgraded by the error policy.
    #[error("recording to {path} aborted: {reason}")]
    RecordingAborted {
        /// Session file path.
        path: PathBuf,
        /// The failure that aborted the recording.
        reason: String,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

fn list_matches(matches: &[ProcessMatch]) -> String {
    matches
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl SockwatchError {
    /// Builds a [`SockwatchError::Io`] for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must end collection whatever the error policy.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::RecordingAborted { .. })
    }

    /// Whether this error reports a file that does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, SockwatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_target_lists_every_match() {
        let err = SockwatchError::AmbiguousTarget {
            name: "sh".into(),
            matches: vec![
                ProcessMatch {
                    pid: 7,
                    comm: "bash".into(),
                    cmdline: "-bash".into(),
                },
                ProcessMatch {
                    pid: 19,
                    comm: "sshd".into(),
                    cmdline: "/usr/sbin/sshd -D".into(),
                },
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("multiple matches for 'sh':"));
        assert!(text.contains("[7] (bash) -bash"));
        assert!(text.contains("[19] (sshd) /usr/sbin/sshd -D"));
    }

    #[test]
    fn not_found_is_detected() {
        let err = SockwatchError::io(
            "/proc/net/netlink",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(err.is_not_found());
        let other = SockwatchError::Config {
            message: "x".into(),
        };
        assert!(!other.is_not_found());
    }

    #[test]
    fn only_aborted_recordings_are_fatal() {
        let aborted = SockwatchError::RecordingAborted {
            path: PathBuf::from("/tmp/s.swrec"),
            reason: "No space left on device".into(),
        };
        assert!(aborted.is_fatal());
        assert!(!SockwatchError::io("/proc/net/tcp", std::io::Error::other("x")).is_fatal());
    }

    #[test]
    fn malformed_line_names_file_and_family() {
        let err = SockwatchError::MalformedLine {
            path: PathBuf::from("/proc/net/tcp"),
            protocol: Protocol::Tcp,
            line: "0: 0100007F:13AD".into(),
            reason: "got 2 fields, need 10".into(),
        };
        let text = err.to_string();
        assert!(text.contains("tcp line from /proc/net/tcp"));
        assert!(text.contains("got 2 fields"));
    }
}
