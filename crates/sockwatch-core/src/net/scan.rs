//! Socket table scanner.
//!
//! Reads one family's table under `<root>/net/`, skips the column header and
//! decodes every remaining line. The first undecodable line aborts the scan:
//! a malformed table means either a kernel ABI change or a torn read, and
//! neither should be papered over by dropping rows.
//!
//! A missing table (family not built into the running kernel) is reported
//! as `SockwatchError::Io`; deciding whether that is fatal is left to the
//! caller, see [`IndexBuilder::available_families`](super::IndexBuilder::available_families).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use sockwatch_common::constants::NET_TABLE_DIR;
use sockwatch_common::error::{Result, SockwatchError};
use sockwatch_common::types::Protocol;

use super::ConnectionRecord;
use super::decode::decode_line;

/// Reads socket tables from a procfs root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableScanner {
    root: PathBuf,
}

impl TableScanner {
    /// Creates a scanner over the proc filesystem mounted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the procfs root this scanner reads from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path of `protocol`'s table.
    #[must_use]
    pub fn table_path(&self, protocol: Protocol) -> PathBuf {
        self.root.join(NET_TABLE_DIR).join(protocol.table_name())
    }

    /// Whether `protocol`'s table exists under the root.
    #[must_use]
    pub fn has_table(&self, protocol: Protocol) -> bool {
        self.table_path(protocol).is_file()
    }

    /// Scans `protocol`'s table.
    ///
    /// # Errors
    ///
    /// Returns `SockwatchError::Io` if the table cannot be opened or read,
    /// and `SockwatchError::MalformedLine` for the first line that fails to
    /// decode. No records are returned in either case.
    pub fn scan(&self, protocol: Protocol) -> Result<Vec<ConnectionRecord>> {
        let path = self.table_path(protocol);
        let file = File::open(&path).map_err(|e| SockwatchError::io(&path, e))?;
        let records = scan_reader(&path, protocol, BufReader::new(file))?;
        tracing::trace!(path = %path.display(), count = records.len(), "table scanned");
        Ok(records)
    }
}

/// Decodes a whole table from `reader`; `path` only labels errors.
///
/// The first line is the column header and is skipped without validation.
/// Every later line must decode, blank ones included.
///
/// # Errors
///
/// See [`TableScanner::scan`].
pub fn scan_reader<R: BufRead>(
    path: &Path,
    protocol: Protocol,
    reader: R,
) -> Result<Vec<ConnectionRecord>> {
    let mut records = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| SockwatchError::io(path, e))?;
        if lineno == 0 {
            continue;
        }
        records.push(decode_line(path, protocol, &line)?);
    }
    Ok(records)
}
