//! # sockwatch — kernel socket monitor
//!
//! Watches the sockets a process holds open by cross-referencing its file
//! descriptors with the kernel socket tables, live or from a recording.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod commands;
mod logging;
mod output;

use clap::Parser;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log, cli.command.is_interactive())?;
    commands::execute(cli)
}
