//! Kernel socket tables.
//!
//! Each table under `<procfs>/net/` describes the open sockets of one
//! protocol family. Lines are decoded into [`ConnectionRecord`]s by
//! [`decode`], read file-by-file by [`scan`], and folded into a single
//! inode-keyed [`ConnectionIndex`] by [`index`].

pub mod decode;
pub mod index;
pub mod scan;

use std::fmt;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use sockwatch_common::types::{Protocol, SocketType, TcpState};

pub use decode::{decode_endpoint, decode_line, encode_endpoint};
pub use index::{ConnectionIndex, IndexBuilder};
pub use scan::TableScanner;

/// One decoded line of a kernel socket table.
///
/// Fields that do not apply to `protocol` stay empty: endpoints and `uid`
/// are only set for IP families, `socket_type` and `path` only for unix
/// sockets, `groups` only for netlink, and `state` only where
/// [`Protocol::has_state`] holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Table family the record was read from.
    pub protocol: Protocol,
    /// Raw unix socket type code.
    pub socket_type: u32,
    /// Raw socket state code.
    pub state: u32,
    /// Local address and port.
    pub local: Option<SocketAddr>,
    /// Remote address and port.
    pub remote: Option<SocketAddr>,
    /// Owning user id.
    pub uid: u32,
    /// Bound filesystem path of a unix socket.
    pub path: Option<String>,
    /// Netlink multicast group mask, as printed by the kernel.
    pub groups: Option<String>,
    /// Kernel inode of the socket.
    pub inode: u64,
}

impl ConnectionRecord {
    /// Creates a record with every optional field empty.
    #[must_use]
    pub const fn new(protocol: Protocol, inode: u64) -> Self {
        Self {
            protocol,
            socket_type: 0,
            state: 0,
            local: None,
            remote: None,
            uid: 0,
            path: None,
            groups: None,
            inode,
        }
    }

    /// Label of the socket state, empty where the family has no state or the
    /// code is unknown.
    #[must_use]
    pub const fn state_label(&self) -> &'static str {
        if self.protocol.has_state() {
            TcpState::label_for(self.state)
        } else {
            ""
        }
    }

    /// Label of the unix socket type, empty for other families.
    #[must_use]
    pub const fn type_label(&self) -> &'static str {
        match self.protocol {
            Protocol::Unix => SocketType::label_for(self.socket_type),
            _ => "",
        }
    }

    /// Whether this is a listening stream socket.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        matches!(self.protocol, Protocol::Tcp | Protocol::Tcp6)
            && TcpState::from_code(self.state) == Some(TcpState::Listen)
    }

    /// Short status column: the type label for unix sockets, the state
    /// label otherwise.
    #[must_use]
    pub const fn info(&self) -> &'static str {
        match self.protocol {
            Protocol::Unix => self.type_label(),
            _ => self.state_label(),
        }
    }
}

fn endpoint(addr: Option<&SocketAddr>) -> String {
    addr.map_or_else(|| "-".to_string(), ToString::to_string)
}

impl fmt::Display for ConnectionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let proto = self.protocol;
        match proto {
            Protocol::Unix => match &self.path {
                Some(path) => write!(f, "({proto}) {} path='{path}'", self.type_label()),
                None => write!(f, "({proto}) {} inode={}", self.type_label(), self.inode),
            },
            Protocol::Netlink => {
                write!(f, "({proto}) groups={}", self.groups.as_deref().unwrap_or(""))
            }
            _ => {
                let remote_unset = self.remote.is_none_or(|r| r.ip().is_unspecified());
                if self.is_listening() || (proto.is_datagram() && remote_unset) {
                    write!(f, "({proto}) {}", endpoint(self.local.as_ref()))
                } else {
                    write!(
                        f,
                        "({proto}) {} <-> {}",
                        endpoint(self.local.as_ref()),
                        endpoint(self.remote.as_ref())
                    )
                }
            }
        }
    }
}
