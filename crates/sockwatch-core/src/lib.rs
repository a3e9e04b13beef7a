//! # sockwatch-core
//!
//! Procfs plumbing for the sampling engine:
//! - [`net`]: per-family decoders for the `net/{tcp,tcp6,udp,udp6,unix,netlink}`
//!   tables, the table scanner and the inode index builder.
//! - [`process`]: process search by name and per-process socket inodes.
//! - [`users`]: uid to user name resolution for display.
//!
//! Every reader takes its filesystem root at construction, so the whole
//! crate can be pointed at a different mount namespace or a fixture tree.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod net;
pub mod process;
pub mod users;
