//! Process lookup over procfs.
//!
//! Resolves a monitoring target by command name and lists the socket inodes
//! a process holds open, read from the `socket:[N]` targets of its
//! `fd/` symlinks.

use std::fs;
use std::path::{Path, PathBuf};

use sockwatch_common::error::{Result, SockwatchError};
use sockwatch_common::types::ProcessMatch;

/// Reads per-process state from a procfs root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessTable {
    root: PathBuf,
}

impl ProcessTable {
    /// Creates a table over the proc filesystem mounted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding `pid`'s entries.
    #[must_use]
    pub fn process_dir(&self, pid: u32) -> PathBuf {
        self.root.join(pid.to_string())
    }

    /// Whether a process with this PID is visible under the root.
    #[must_use]
    pub fn exists(&self, pid: u32) -> bool {
        self.process_dir(pid).is_dir()
    }

    /// Lists every PID under the root, ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be read.
    pub fn pids(&self) -> Result<Vec<u32>> {
        let entries = fs::read_dir(&self.root).map_err(|e| SockwatchError::io(&self.root, e))?;
        let mut pids: Vec<u32> = entries
            .flatten()
            .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
            .filter(|pid| *pid > 0)
            .collect();
        pids.sort_unstable();
        Ok(pids)
    }

    /// Describes a single process.
    ///
    /// # Errors
    ///
    /// Returns an error if the process's `comm` cannot be read.
    pub fn describe(&self, pid: u32) -> Result<ProcessMatch> {
        let dir = self.process_dir(pid);
        let comm_path = dir.join("comm");
        let comm = fs::read_to_string(&comm_path).map_err(|e| SockwatchError::io(&comm_path, e))?;
        let cmdline = fs::read(dir.join("cmdline"))
            .map(|raw| join_cmdline(&raw))
            .unwrap_or_default();
        Ok(ProcessMatch {
            pid,
            comm: comm.trim_end().to_string(),
            cmdline,
        })
    }

    /// Every process whose command name contains `name`, sorted by PID.
    ///
    /// Processes that exit while being inspected are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be read.
    pub fn matches(&self, name: &str) -> Result<Vec<ProcessMatch>> {
        Ok(self
            .pids()?
            .into_iter()
            .filter_map(|pid| self.describe(pid).ok())
            .filter(|m| !m.comm.is_empty() && m.comm.contains(name))
            .collect())
    }

    /// Resolves `name` to exactly one PID.
    ///
    /// # Errors
    ///
    /// Returns `SockwatchError::NoSuchTarget` when nothing matches and
    /// `SockwatchError::AmbiguousTarget` when several processes match.
    pub fn search(&self, name: &str) -> Result<u32> {
        let mut found = self.matches(name)?;
        match found.len() {
            0 => Err(SockwatchError::NoSuchTarget {
                name: name.to_string(),
            }),
            1 => {
                let target = found.remove(0);
                tracing::info!(pid = target.pid, comm = %target.comm, "target resolved");
                Ok(target.pid)
            }
            _ => Err(SockwatchError::AmbiguousTarget {
                name: name.to_string(),
                matches: found,
            }),
        }
    }

    /// Socket inodes held open by `pid`, ascending and deduplicated.
    ///
    /// Descriptors closed while the directory is walked are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the process's `fd/` directory cannot be read.
    pub fn socket_inodes(&self, pid: u32) -> Result<Vec<u64>> {
        let fd_dir = self.process_dir(pid).join("fd");
        let entries = fs::read_dir(&fd_dir).map_err(|e| SockwatchError::io(&fd_dir, e))?;
        let mut inodes: Vec<u64> = entries
            .flatten()
            .filter_map(|entry| fs::read_link(entry.path()).ok())
            .filter_map(|link| parse_socket_link(&link))
            .collect();
        inodes.sort_unstable();
        inodes.dedup();
        Ok(inodes)
    }
}

/// Extracts the inode from a `socket:[12345]` link target.
#[must_use]
pub fn parse_socket_link(link: &Path) -> Option<u64> {
    link.to_str()?
        .strip_prefix("socket:[")?
        .strip_suffix(']')?
        .parse()
        .ok()
}

fn join_cmdline(raw: &[u8]) -> String {
    raw.split(|b| *b == 0)
        .filter(|arg| !arg.is_empty())
        .map(String::from_utf8_lossy)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::symlink;

    use super::*;

    fn add_process(root: &Path, pid: u32, comm: &str, cmdline: &[&str], sockets: &[u64]) {
        let dir = root.join(pid.to_string());
        fs::create_dir_all(dir.join("fd")).unwrap();
        fs::write(dir.join("comm"), format!("{comm}\n")).unwrap();
        let mut raw = Vec::new();
        for arg in cmdline {
            raw.extend_from_slice(arg.as_bytes());
            raw.push(0);
        }
        fs::write(dir.join("cmdline"), raw).unwrap();
        symlink("/dev/null", dir.join("fd").join("0")).unwrap();
        for (i, inode) in sockets.iter().enumerate() {
            symlink(format!("socket:[{inode}]"), dir.join("fd").join((i + 3).to_string()))
                .unwrap();
        }
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        add_process(dir.path(), 1, "systemd", &["/sbin/init"], &[100]);
        add_process(dir.path(), 812, "nginx", &["nginx", "-g", "daemon off;"], &[300, 200, 300]);
        add_process(dir.path(), 90, "sshd", &["/usr/sbin/sshd", "-D"], &[]);
        add_process(dir.path(), 4000, "bash", &["-bash"], &[]);
        fs::create_dir_all(dir.path().join("net")).unwrap();
        fs::write(dir.path().join("uptime"), "1.0 1.0\n").unwrap();
        dir
    }

    #[test]
    fn pids_ignore_non_numeric_entries() {
        let dir = fixture();
        let table = ProcessTable::new(dir.path());
        assert_eq!(table.pids().unwrap(), vec![1, 90, 812, 4000]);
    }

    #[test]
    fn search_resolves_single_match() {
        let dir = fixture();
        let table = ProcessTable::new(dir.path());
        assert_eq!(table.search("ngin").unwrap(), 812);
    }

    #[test]
    fn search_without_match_fails() {
        let dir = fixture();
        let err = ProcessTable::new(dir.path()).search("postgres").unwrap_err();
        assert!(matches!(err, SockwatchError::NoSuchTarget { name } if name == "postgres"));
    }

    #[test]
    fn search_with_several_matches_lists_them_by_pid() {
        let dir = fixture();
        let err = ProcessTable::new(dir.path()).search("sh").unwrap_err();
        match err {
            SockwatchError::AmbiguousTarget { matches, .. } => {
                let pids: Vec<_> = matches.iter().map(|m| m.pid).collect();
                assert_eq!(pids, vec![90, 4000]);
                assert_eq!(matches[0].cmdline, "/usr/sbin/sshd -D");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn socket_inodes_are_sorted_and_unique() {
        let dir = fixture();
        let table = ProcessTable::new(dir.path());
        assert_eq!(table.socket_inodes(812).unwrap(), vec![200, 300]);
        assert!(table.socket_inodes(90).unwrap().is_empty());
    }

    #[test]
    fn socket_inodes_of_missing_process_fail() {
        let dir = fixture();
        let table = ProcessTable::new(dir.path());
        assert!(!table.exists(31337));
        assert!(table.socket_inodes(31337).is_err());
    }

    #[test]
    fn socket_link_parsing() {
        assert_eq!(parse_socket_link(Path::new("socket:[18083222]")), Some(18_083_222));
        assert_eq!(parse_socket_link(Path::new("pipe:[12]")), None);
        assert_eq!(parse_socket_link(Path::new("/dev/pts/0")), None);
        assert_eq!(parse_socket_link(Path::new("socket:[x]")), None);
    }
}
