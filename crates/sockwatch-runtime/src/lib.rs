//! # sockwatch-runtime
//!
//! Turns the procfs readers into a stream of snapshots:
//! - [`snapshot`]: the unit of data handed to consumers.
//! - [`source`]: live, recording and replay data sources behind one trait.
//! - [`session`]: the on-disk session format, its recorder and its player.
//! - [`ticker`]: fixed-period deadlines that collapse missed ticks.
//! - [`sampler`]: pause/resume, force refresh and delivery to sinks.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod sampler;
pub mod session;
pub mod snapshot;
pub mod source;
pub mod ticker;
