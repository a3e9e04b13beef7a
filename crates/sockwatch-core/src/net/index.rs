//! Inode-keyed connection index.
//!
//! A kernel socket owns exactly one inode, so within a consistent snapshot
//! the inode is a unique key across every family. Tables are read one after
//! the other while sockets come and go, so a collision can still show up;
//! the family scanned later wins.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sockwatch_common::error::{Result, SockwatchError};
use sockwatch_common::types::Protocol;

use super::ConnectionRecord;
use super::scan::TableScanner;

/// Mapping from kernel inode to the socket it names.
///
/// Serialized as a list of records in inode order; each record carries its
/// own inode. A stored list naming the same inode twice does not deserialize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ConnectionRecord>", into = "Vec<ConnectionRecord>")]
pub struct ConnectionIndex {
    by_inode: BTreeMap<u64, ConnectionRecord>,
}

impl ConnectionIndex {
    /// Creates an empty index.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            by_inode: BTreeMap::new(),
        }
    }

    /// Inserts `record`, returning the record it displaced, if any.
    pub fn insert(&mut self, record: ConnectionRecord) -> Option<ConnectionRecord> {
        self.by_inode.insert(record.inode, record)
    }

    /// Looks up the socket named by `inode`.
    #[must_use]
    pub fn lookup(&self, inode: u64) -> Option<&ConnectionRecord> {
        self.by_inode.get(&inode)
    }

    /// Number of sockets in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_inode.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_inode.is_empty()
    }

    /// Iterates over every socket in inode order.
    pub fn iter(&self) -> impl Iterator<Item = &ConnectionRecord> {
        self.by_inode.values()
    }

    /// Resolves a process's socket inodes, skipping inodes with no entry.
    pub fn resolve<'a>(
        &'a self,
        inodes: &'a [u64],
    ) -> impl Iterator<Item = &'a ConnectionRecord> + 'a {
        inodes.iter().filter_map(|inode| self.lookup(*inode))
    }

    /// Number of sockets per family.
    #[must_use]
    pub fn count_by_protocol(&self) -> BTreeMap<Protocol, usize> {
        let mut counts = BTreeMap::new();
        for record in self.iter() {
            *counts.entry(record.protocol).or_insert(0) += 1;
        }
        counts
    }
}

impl FromIterator<ConnectionRecord> for ConnectionIndex {
    fn from_iter<I: IntoIterator<Item = ConnectionRecord>>(iter: I) -> Self {
        let mut index = Self::new();
        for record in iter {
            let _ = index.insert(record);
        }
        index
    }
}

impl TryFrom<Vec<ConnectionRecord>> for ConnectionIndex {
    type Error = SockwatchError;

    fn try_from(records: Vec<ConnectionRecord>) -> Result<Self> {
        let mut index = Self::new();
        for record in records {
            let inode = record.inode;
            if index.insert(record).is_some() {
                return Err(SockwatchError::DuplicateInode { inode });
            }
        }
        Ok(index)
    }
}

impl From<ConnectionIndex> for Vec<ConnectionRecord> {
    fn from(index: ConnectionIndex) -> Self {
        index.by_inode.into_values().collect()
    }
}

/// Builds a fresh [`ConnectionIndex`] from the kernel tables.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    scanner: TableScanner,
    families: Vec<Protocol>,
}

impl IndexBuilder {
    /// Creates a builder over every supported family, in scan order.
    #[must_use]
    pub fn new(scanner: TableScanner) -> Self {
        Self {
            scanner,
            families: Protocol::ALL.to_vec(),
        }
    }

    /// Replaces the family list. Families are scanned in the given order.
    #[must_use]
    pub fn with_families(mut self, families: impl IntoIterator<Item = Protocol>) -> Self {
        self.families = families.into_iter().collect();
        self
    }

    /// Families scanned by [`build`](Self::build).
    #[must_use]
    pub fn families(&self) -> &[Protocol] {
        &self.families
    }

    /// Configured families whose table exists under the scanner's root.
    #[must_use]
    pub fn available_families(&self) -> Vec<Protocol> {
        self.families
            .iter()
            .copied()
            .filter(|p| self.scanner.has_table(*p))
            .collect()
    }

    /// Scans every family and folds the records by inode.
    ///
    /// # Errors
    ///
    /// Returns the first scan error; no partial index is returned.
    pub fn build(&self) -> Result<ConnectionIndex> {
        let mut index = ConnectionIndex::new();
        for protocol in &self.families {
            for record in self.scanner.scan(*protocol)? {
                let inode = record.inode;
                if let Some(previous) = index.insert(record) {
                    tracing::debug!(
                        inode,
                        previous = %previous.protocol,
                        winner = %protocol,
                        "inode seen in two tables"
                    );
                }
            }
        }
        tracing::trace!(count = index.len(), "connection index built");
        Ok(index)
    }
}
