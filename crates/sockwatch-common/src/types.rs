//! Domain primitive types used across the sockwatch workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SockwatchError;

/// Kernel socket table family.
///
/// The declaration order is the fixed scan order used when building an
/// inode index: on an inode collision the later family wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// TCP over IPv4 (`net/tcp`).
    Tcp,
    /// TCP over IPv6 (`net/tcp6`).
    Tcp6,
    /// UDP over IPv4 (`net/udp`).
    Udp,
    /// UDP over IPv6 (`net/udp6`).
    Udp6,
    /// Unix-domain sockets (`net/unix`).
    Unix,
    /// Netlink sockets (`net/netlink`).
    Netlink,
}

/// Column layout of a socket table, one decoder per layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLayout {
    /// `sl local rem st tx:rx tr:when retrnsmt uid timeout inode ...`
    Inet,
    /// `Num RefCount Protocol Flags Type St Inode [Path]`
    Unix,
    /// `sk Eth Pid Groups Rmem Wmem Dump Locks Drops Inode`
    Netlink,
}

impl TableLayout {
    /// Minimum number of whitespace-separated columns a data line must have.
    #[must_use]
    pub const fn min_columns(self) -> usize {
        match self {
            Self::Inet | Self::Netlink => 10,
            Self::Unix => 7,
        }
    }
}

impl Protocol {
    /// Every supported family, in scan order.
    pub const ALL: [Self; 6] = [
        Self::Tcp,
        Self::Tcp6,
        Self::Udp,
        Self::Udp6,
        Self::Unix,
        Self::Netlink,
    ];

    /// File name of this family's table under `<procfs>/net/`.
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Tcp6 => "tcp6",
            Self::Udp => "udp",
            Self::Udp6 => "udp6",
            Self::Unix => "unix",
            Self::Netlink => "netlink",
        }
    }

    /// Column layout used by this family's table.
    #[must_use]
    pub const fn layout(self) -> TableLayout {
        match self {
            Self::Tcp | Self::Tcp6 | Self::Udp | Self::Udp6 => TableLayout::Inet,
            Self::Unix => TableLayout::Unix,
            Self::Netlink => TableLayout::Netlink,
        }
    }

    /// Whether the socket state column carries a meaningful value.
    #[must_use]
    pub const fn has_state(self) -> bool {
        matches!(self, Self::Tcp | Self::Tcp6 | Self::Unix)
    }

    /// Whether this is a datagram family.
    #[must_use]
    pub const fn is_datagram(self) -> bool {
        matches!(self, Self::Udp | Self::Udp6)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for Protocol {
    type Err = SockwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.table_name() == s)
            .ok_or_else(|| SockwatchError::Config {
                message: format!("unknown protocol family: {s}"),
            })
    }
}

/// Kernel TCP socket states, as numbered in `include/net/tcp_states.h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TcpState {
    /// `TCP_ESTABLISHED` (1).
    Established,
    /// `TCP_SYN_SENT` (2).
    SynSent,
    /// `TCP_SYN_RECV` (3).
    SynRecv,
    /// `TCP_FIN_WAIT1` (4).
    FinWait1,
    /// `TCP_FIN_WAIT2` (5).
    FinWait2,
    /// `TCP_TIME_WAIT` (6).
    TimeWait,
    /// `TCP_CLOSE` (7).
    Close,
    /// `TCP_CLOSE_WAIT` (8).
    CloseWait,
    /// `TCP_LAST_ACK` (9).
    LastAck,
    /// `TCP_LISTEN` (10).
    Listen,
    /// `TCP_CLOSING` (11).
    Closing,
}

impl TcpState {
    /// Maps a raw state code to its variant.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => Self::Established,
            2 => Self::SynSent,
            3 => Self::SynRecv,
            4 => Self::FinWait1,
            5 => Self::FinWait2,
            6 => Self::TimeWait,
            7 => Self::Close,
            8 => Self::CloseWait,
            9 => Self::LastAck,
            10 => Self::Listen,
            11 => Self::Closing,
            _ => return None,
        })
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Established => "ESTABLISHED",
            Self::SynSent => "SYN_SENT",
            Self::SynRecv => "SYN_RECV",
            Self::FinWait1 => "FIN_WAIT1",
            Self::FinWait2 => "FIN_WAIT2",
            Self::TimeWait => "TIME_WAIT",
            Self::Close => "CLOSE",
            Self::CloseWait => "CLOSE_WAIT",
            Self::LastAck => "LAST_ACK",
            Self::Listen => "LISTEN",
            Self::Closing => "CLOSING",
        }
    }

    /// Label for a raw code; unknown codes yield an empty label.
    #[must_use]
    pub const fn label_for(code: u32) -> &'static str {
        match Self::from_code(code) {
            Some(state) => state.label(),
            None => "",
        }
    }
}

impl fmt::Display for TcpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unix-domain socket types reported in the `Type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketType {
    /// `SOCK_STREAM` (1).
    Stream,
    /// `SOCK_DGRAM` (2).
    Datagram,
    /// `SOCK_SEQPACKET` (5).
    SeqPacket,
}

impl SocketType {
    /// Maps a raw type code to its variant.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Stream),
            2 => Some(Self::Datagram),
            5 => Some(Self::SeqPacket),
            _ => None,
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Stream => "SOCK_STREAM",
            Self::Datagram => "SOCK_DGRAM",
            Self::SeqPacket => "SOCK_SEQPACKET",
        }
    }

    /// Label for a raw code; unknown codes yield an empty label.
    #[must_use]
    pub const fn label_for(code: u32) -> &'static str {
        match Self::from_code(code) {
            Some(kind) => kind.label(),
            None => "",
        }
    }
}

/// A process matched by a name search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessMatch {
    /// Process ID.
    pub pid: u32,
    /// Short command name from `comm`.
    pub comm: String,
    /// Full command line, arguments joined by spaces.
    pub cmdline: String,
}

impl fmt::Display for ProcessMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ({}) {}", self.pid, self.comm, self.cmdline)
    }
}
