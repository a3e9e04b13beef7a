//! # sockwatch-tui
//!
//! Interactive terminal dashboard for sockwatch.
//!
//! Built with `ratatui` and `crossterm`, providing:
//! - A per-target view of the monitored process's sockets.
//! - A host-wide view of every socket in the latest snapshot.
//! - Key bindings for pause, force refresh and view switching.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod app;
pub mod event;
pub mod ui;
