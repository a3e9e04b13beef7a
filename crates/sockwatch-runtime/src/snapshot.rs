//! Snapshots delivered to consumers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sockwatch_core::net::{ConnectionIndex, ConnectionRecord};

/// Socket inodes held by the monitored process at collection time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSockets {
    /// Monitored process.
    pub pid: u32,
    /// Socket inodes from its descriptor table.
    pub inodes: Vec<u64>,
}

/// Everything one collection cycle produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Every socket on the host, by inode.
    pub connections: ConnectionIndex,
    /// The monitored process's sockets, when a target is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetSockets>,
    /// Sibling datasets carried through recording and replay untouched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Snapshot {
    /// Creates a snapshot with no target and no extra data.
    #[must_use]
    pub fn new(connections: ConnectionIndex) -> Self {
        Self {
            connections,
            target: None,
            extra: BTreeMap::new(),
        }
    }

    /// The target's sockets resolved through the index.
    ///
    /// Inodes without a table entry (sockets of families not scanned, or
    /// sockets opened after the tables were read) are left out.
    #[must_use]
    pub fn target_connections(&self) -> Vec<&ConnectionRecord> {
        self.target
            .as_ref()
            .map(|t| self.connections.resolve(&t.inodes).collect())
            .unwrap_or_default()
    }
}

/// A snapshot stamped with its collection time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// When the collection ran.
    pub timestamp: DateTime<Utc>,
    /// What it produced.
    pub snapshot: Snapshot,
}
