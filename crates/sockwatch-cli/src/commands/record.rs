//! `sockwatch record` — Record a session without the dashboard.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use clap::Args;
use sockwatch_common::config::SourceMode;
use sockwatch_runtime::sampler::{Sampler, SnapshotSink};
use sockwatch_runtime::snapshot::Sample;
use sockwatch_runtime::source::build_source;

use super::MonitorArgs;
use crate::output;

/// Arguments for the `record` command.
#[derive(Args, Debug)]
pub struct RecordArgs {
    /// Session file to write.
    pub file: PathBuf,

    /// Stop after this many samples.
    #[arg(short = 'n', long)]
    pub count: Option<u64>,
}

/// Raises the stop flag once enough samples went through.
struct StopAfter {
    remaining: u64,
    stop: Arc<AtomicBool>,
}

impl SnapshotSink for StopAfter {
    fn deliver(&mut self, _sample: &Arc<Sample>) {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.stop.store(true, Ordering::SeqCst);
        }
    }
}

/// Executes the `record` command.
///
/// # Errors
///
/// Returns an error if the target cannot be resolved, the session file
/// already exists or cannot be written, or a collection fails under the
/// terminate policy.
pub fn execute(args: RecordArgs, monitor: &MonitorArgs) -> anyhow::Result<()> {
    if args.count == Some(0) {
        anyhow::bail!("--count must be greater than zero");
    }
    let path = output::session_path(args.file);
    let config = monitor.config(SourceMode::Record(path.clone()))?;
    let target = super::resolve(&config)?;
    let sampler = Sampler::new(build_source(&config, Some(target))?, config.on_error);

    let stop = Arc::new(AtomicBool::new(false));
    if let Some(count) = args.count {
        sampler.register(StopAfter {
            remaining: count,
            stop: Arc::clone(&stop),
        });
    }
    let s = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        s.store(true, Ordering::SeqCst);
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))?;

    eprintln!(
        "  Recording pid {target} to {} every {} ms. Press Ctrl+C to stop.",
        path.display(),
        config.refresh_period_ms
    );
    let started = Instant::now();
    let result = sampler.run(config.refresh_period(), &stop);
    let finished = sampler.finish();
    result?;
    finished?;

    eprintln!(
        "  Stopped after {} collection(s) in {}.",
        sampler.collections(),
        output::format_duration(started.elapsed())
    );
    Ok(())
}
