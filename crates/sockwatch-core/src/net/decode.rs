//! Per-family line decoders.
//!
//! ```text
//! net/tcp:
//!   sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
//!   0:  0100007F:13AD 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 18083222
//! net/unix:
//!   Num       RefCount Protocol Flags    Type St Inode Path
//!   0000000000000000: 00000002 00000000 00010000 0001 01 28271 /run/user/1000/gnupg/S.dirmngr
//! net/netlink:
//!   sk               Eth Pid        Groups   Rmem     Wmem     Dump     Locks     Drops     Inode
//!   0000000000000000 0   2014       00000110 0        0        0        2         0         27854
//! ```
//!
//! Columns are split on whitespace only. The kernel does not quote unix
//! socket paths, so a path containing spaces is cut at its first space.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::Path;

use sockwatch_common::error::{Result, SockwatchError};
use sockwatch_common::types::{Protocol, TableLayout};

use super::ConnectionRecord;

/// Location of a line being decoded, used to build errors.
struct LineContext<'a> {
    path: &'a Path,
    protocol: Protocol,
    fields: &'a [&'a str],
}

impl LineContext<'_> {
    fn malformed(&self, reason: impl Into<String>) -> SockwatchError {
        SockwatchError::MalformedLine {
            path: self.path.to_path_buf(),
            protocol: self.protocol,
            line: self.fields.join(" "),
            reason: reason.into(),
        }
    }

    fn hex_u32(&self, index: usize, column: &str) -> Result<u32> {
        u32::from_str_radix(self.fields[index], 16)
            .map_err(|e| self.malformed(format!("{column} '{}': {e}", self.fields[index])))
    }

    fn dec_u32(&self, index: usize, column: &str) -> Result<u32> {
        self.fields[index]
            .parse()
            .map_err(|e| self.malformed(format!("{column} '{}': {e}", self.fields[index])))
    }

    fn dec_u64(&self, index: usize, column: &str) -> Result<u64> {
        self.fields[index]
            .parse()
            .map_err(|e| self.malformed(format!("{column} '{}': {e}", self.fields[index])))
    }

    fn endpoint(&self, index: usize, column: &str) -> Result<SocketAddr> {
        decode_endpoint(self.fields[index])
            .ok_or_else(|| self.malformed(format!("{column} '{}'", self.fields[index])))
    }
}

/// Decodes one data line of `protocol`'s table read from `path`.
///
/// # Errors
///
/// Returns `SockwatchError::MalformedLine` if the line has fewer columns than
/// the family's layout requires or if any numeric column fails to convert.
pub fn decode_line(path: &Path, protocol: Protocol, line: &str) -> Result<ConnectionRecord> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let ctx = LineContext {
        path,
        protocol,
        fields: &fields,
    };

    let layout = protocol.layout();
    if fields.len() < layout.min_columns() {
        return Err(ctx.malformed(format!(
            "got {} fields, need at least {}",
            fields.len(),
            layout.min_columns()
        )));
    }

    match layout {
        TableLayout::Inet => decode_inet(&ctx),
        TableLayout::Unix => decode_unix(&ctx),
        TableLayout::Netlink => decode_netlink(&ctx),
    }
}

fn decode_inet(ctx: &LineContext<'_>) -> Result<ConnectionRecord> {
    Ok(ConnectionRecord {
        local: Some(ctx.endpoint(1, "local address")?),
        remote: Some(ctx.endpoint(2, "remote address")?),
        state: ctx.hex_u32(3, "state")?,
        uid: ctx.dec_u32(7, "uid")?,
        ..ConnectionRecord::new(ctx.protocol, ctx.dec_u64(9, "inode")?)
    })
}

fn decode_unix(ctx: &LineContext<'_>) -> Result<ConnectionRecord> {
    Ok(ConnectionRecord {
        socket_type: ctx.hex_u32(4, "type")?,
        state: ctx.hex_u32(5, "state")?,
        path: ctx.fields.get(7).map(ToString::to_string),
        ..ConnectionRecord::new(ctx.protocol, ctx.dec_u64(6, "inode")?)
    })
}

fn decode_netlink(ctx: &LineContext<'_>) -> Result<ConnectionRecord> {
    Ok(ConnectionRecord {
        groups: Some(ctx.fields[3].to_string()),
        ..ConnectionRecord::new(ctx.protocol, ctx.dec_u64(9, "inode")?)
    })
}

/// Decodes a packed `ADDR:PORT` column.
///
/// The address is the in-memory `in_addr`/`in6_addr` printed as native-endian
/// 32-bit hex words (8 or 32 digits); the port is big-endian hex.
#[must_use]
pub fn decode_endpoint(field: &str) -> Option<SocketAddr> {
    let (addr, port) = field.split_once(':')?;
    let port = u16::from_str_radix(port, 16).ok()?;
    let ip = match addr.len() {
        8 => IpAddr::V4(Ipv4Addr::from(decode_words::<4>(addr)?)),
        32 => IpAddr::V6(Ipv6Addr::from(decode_words::<16>(addr)?)),
        _ => return None,
    };
    Some(SocketAddr::new(ip, port))
}

fn decode_words<const N: usize>(hex: &str) -> Option<[u8; N]> {
    if !hex.is_ascii() {
        return None;
    }
    let mut out = [0u8; N];
    for (i, chunk) in out.chunks_exact_mut(4).enumerate() {
        let word = u32::from_str_radix(&hex[i * 8..i * 8 + 8], 16).ok()?;
        chunk.copy_from_slice(&word.to_ne_bytes());
    }
    Some(out)
}

/// Encodes an endpoint back into the kernel's `ADDR:PORT` column form.
#[must_use]
pub fn encode_endpoint(addr: &SocketAddr) -> String {
    let octets: Vec<u8> = match addr.ip() {
        IpAddr::V4(ip) => ip.octets().to_vec(),
        IpAddr::V6(ip) => ip.octets().to_vec(),
    };
    let mut out = String::with_capacity(octets.len() * 2 + 5);
    for chunk in octets.chunks_exact(4) {
        let word = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        out.push_str(&format!("{word:08X}"));
    }
    out.push_str(&format!(":{:04X}", addr.port()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const TCP_LISTEN: &str = "0: 0100007F:13AD 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 18083222 1 0000000000000000 100 0 0 10 0";

    fn decode(protocol: Protocol, line: &str) -> Result<ConnectionRecord> {
        decode_line(
            Path::new(&format!("/proc/net/{}", protocol.table_name())),
            protocol,
            line,
        )
    }

    #[cfg(target_endian = "little")]
    #[test]
    fn tcp_listen_line_decodes() {
        let rec = decode(Protocol::Tcp, TCP_LISTEN).unwrap();
        assert_eq!(rec.local, Some("127.0.0.1:5037".parse().unwrap()));
        assert_eq!(rec.remote, Some("0.0.0.0:0".parse().unwrap()));
        assert_eq!(rec.state_label(), "LISTEN");
        assert_eq!(rec.uid, 1000);
        assert_eq!(rec.inode, 18_083_222);
        assert_eq!(rec.path, None);
    }

    #[cfg(target_endian = "little")]
    #[test]
    fn tcp6_loopback_decodes() {
        let line = "0: 00000000000000000000000001000000:0277 00000000000000000000000000000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 30981 1";
        let rec = decode(Protocol::Tcp6, line).unwrap();
        assert_eq!(rec.local, Some("[::1]:631".parse().unwrap()));
        assert_eq!(rec.remote, Some("[::]:0".parse().unwrap()));
        assert!(rec.is_listening());
    }

    #[test]
    fn unknown_state_is_not_an_error() {
        let line = TCP_LISTEN.replacen(" 0A ", " 0D ", 1);
        let rec = decode(Protocol::Tcp, &line).unwrap();
        assert_eq!(rec.state, 0x0D);
        assert_eq!(rec.state_label(), "");
    }

    #[test]
    fn unix_line_without_path() {
        let line = "0000000000000000: 00000002 00000000 00000000 0001 01 41233";
        let rec = decode(Protocol::Unix, line).unwrap();
        assert_eq!(rec.type_label(), "SOCK_STREAM");
        assert_eq!(rec.state_label(), "ESTABLISHED");
        assert_eq!(rec.path, None);
        assert_eq!(rec.inode, 41233);
        assert_eq!(rec.local, None);
    }

    #[test]
    fn unix_line_with_path() {
        let line = "0000000000000000: 00000002 00000000 00010000 0001 01 28271 /run/user/1000/gnupg/S.dirmngr";
        let rec = decode(Protocol::Unix, line).unwrap();
        assert_eq!(rec.path.as_deref(), Some("/run/user/1000/gnupg/S.dirmngr"));
    }

    #[test]
    fn unix_path_with_space_is_cut_at_first_space() {
        let line = "0000000000000000: 00000002 00000000 00010000 0001 01 28271 /tmp/my socket";
        let rec = decode(Protocol::Unix, line).unwrap();
        assert_eq!(rec.path.as_deref(), Some("/tmp/my"));
    }

    #[test]
    fn netlink_line_keeps_raw_groups() {
        let line = "0000000000000000 0   2014       00000110 0        0        0        2         0         27854";
        let rec = decode(Protocol::Netlink, line).unwrap();
        assert_eq!(rec.groups.as_deref(), Some("00000110"));
        assert_eq!(rec.inode, 27854);
        assert_eq!(rec.local, None);
        assert_eq!(rec.state, 0);
    }

    #[test]
    fn short_lines_are_rejected_per_family() {
        let err = decode(Protocol::Udp, "0: 0100007F:13AD 00000000:0000 07").unwrap_err();
        assert!(matches!(err, SockwatchError::MalformedLine { protocol: Protocol::Udp, .. }));

        let err = decode(Protocol::Unix, "0000000000000000: 00000002 00000000 00000000 0001 01")
            .unwrap_err();
        assert!(err.to_string().contains("got 6 fields, need at least 7"));

        assert!(decode(Protocol::Netlink, "0000000000000000 0 2014 00000110 0 0 0 2 0").is_err());
    }

    #[test]
    fn bad_hex_is_fatal_for_the_line() {
        let line = TCP_LISTEN.replacen(" 0A ", " ZZ ", 1);
        let err = decode(Protocol::Tcp, &line).unwrap_err();
        match err {
            SockwatchError::MalformedLine { line, reason, .. } => {
                assert!(reason.starts_with("state 'ZZ'"));
                assert!(line.starts_with("0: 0100007F:13AD"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_address_length_is_rejected() {
        let line = TCP_LISTEN.replacen("0100007F:13AD", "0100007:13AD", 1);
        assert!(decode(Protocol::Tcp, &line).is_err());
        assert_eq!(decode_endpoint("0100007F"), None);
    }

    #[test]
    fn endpoint_hex_roundtrips() {
        for field in [
            "0100007F:13AD",
            "00000000:0000",
            "2200A8C0:01BB",
            "00000000000000000000000001000000:0277",
            "B80D0120000000000000000001000000:FFFF",
        ] {
            let addr = decode_endpoint(field).unwrap();
            assert_eq!(encode_endpoint(&addr), field);
        }
    }
}
