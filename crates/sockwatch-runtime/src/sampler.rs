//! Collection scheduling.
//!
//! The [`Sampler`] owns the active [`DataSource`], runs at most one
//! collection at a time and hands every sample to its registered sinks.
//! Ticks are skipped while paused; a force refresh always collects.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{Sender, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use sockwatch_common::config::ErrorPolicy;
use sockwatch_common::error::Result;

use crate::snapshot::Sample;
use crate::source::{DataSource, SourceKind};
use crate::ticker::Ticker;

/// Longest sleep of [`Sampler::run`] before it rechecks its stop flag.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    /// Ticks collect.
    Running,
    /// Ticks are ignored; force refreshes still collect.
    Paused,
}

/// Result of one tick or force refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// A sample was collected and delivered.
    Delivered(Arc<Sample>),
    /// The sampler is paused; nothing was collected.
    Paused,
    /// Another collection was in flight; this request was dropped.
    Coalesced,
    /// The collection failed and the error policy skipped it.
    Skipped,
    /// The source has no more samples.
    Exhausted,
}

/// Receives every delivered sample.
pub trait SnapshotSink: Send {
    /// Hands a sample to the consumer. Must not block.
    fn deliver(&mut self, sample: &Arc<Sample>);
}

impl SnapshotSink for Sender<Arc<Sample>> {
    fn deliver(&mut self, sample: &Arc<Sample>) {
        if self.send(Arc::clone(sample)).is_err() {
            tracing::debug!("snapshot receiver dropped");
        }
    }
}

/// A bounded channel keeps at most its capacity of undelivered samples;
/// newer samples are dropped while the consumer is behind.
impl SnapshotSink for SyncSender<Arc<Sample>> {
    fn deliver(&mut self, sample: &Arc<Sample>) {
        match self.try_send(Arc::clone(sample)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => tracing::trace!("consumer busy, sample dropped"),
            Err(TrySendError::Disconnected(_)) => tracing::debug!("snapshot receiver dropped"),
        }
    }
}

/// Drives collections from a single data source.
pub struct Sampler {
    source: Mutex<Box<dyn DataSource>>,
    kind: SourceKind,
    policy: ErrorPolicy,
    paused: AtomicBool,
    exhausted: AtomicBool,
    collections: AtomicU64,
    sinks: Mutex<Vec<Box<dyn SnapshotSink>>>,
    latest: RwLock<Option<Arc<Sample>>>,
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("kind", &self.kind)
            .field("policy", &self.policy)
            .field("state", &self.state())
            .field("collections", &self.collections())
            .finish_non_exhaustive()
    }
}

impl Sampler {
    /// Creates a running sampler over `source`.
    pub fn new(source: Box<dyn DataSource>, policy: ErrorPolicy) -> Self {
        Self {
            kind: source.kind(),
            source: Mutex::new(source),
            policy,
            paused: AtomicBool::new(false),
            exhausted: AtomicBool::new(false),
            collections: AtomicU64::new(0),
            sinks: Mutex::new(Vec::new()),
            latest: RwLock::new(None),
        }
    }

    /// Adds a consumer for every later sample.
    pub fn register(&self, sink: impl SnapshotSink + 'static) {
        lock(&self.sinks).push(Box::new(sink));
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SamplerState {
        if self.paused.load(Ordering::SeqCst) {
            SamplerState::Paused
        } else {
            SamplerState::Running
        }
    }

    /// Stops ticks from collecting.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        tracing::debug!("sampler paused");
    }

    /// Lets ticks collect again.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        tracing::debug!("sampler resumed");
    }

    /// Flips between running and paused and returns the new state.
    pub fn toggle_pause(&self) -> SamplerState {
        let was_paused = self.paused.fetch_xor(true, Ordering::SeqCst);
        let state = if was_paused {
            SamplerState::Running
        } else {
            SamplerState::Paused
        };
        tracing::debug!(?state, "sampler toggled");
        state
    }

    /// Handles one scheduled tick.
    ///
    /// # Errors
    ///
    /// Returns the collection error under [`ErrorPolicy::Terminate`], and
    /// fatal errors such as an aborted recording under any policy.
    pub fn tick(&self) -> Result<TickOutcome> {
        if self.state() == SamplerState::Paused {
            return Ok(TickOutcome::Paused);
        }
        self.collect()
    }

    /// Collects once regardless of the pause state, leaving it unchanged.
    ///
    /// # Errors
    ///
    /// See [`tick`](Self::tick).
    pub fn force_refresh(&self) -> Result<TickOutcome> {
        tracing::debug!("forced refresh");
        self.collect()
    }

    /// The most recently delivered sample.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<Sample>> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of collections attempted so far.
    #[must_use]
    pub fn collections(&self) -> u64 {
        self.collections.load(Ordering::SeqCst)
    }

    /// Whether the source reported it has no more samples.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::SeqCst)
    }

    /// Kind of the active source.
    #[must_use]
    pub const fn source_kind(&self) -> SourceKind {
        self.kind
    }

    /// Delay the source asks for before the next collection.
    #[must_use]
    pub fn next_delay(&self) -> Option<Duration> {
        lock(&self.source).next_delay()
    }

    /// Finalizes the source, closing any recording.
    ///
    /// # Errors
    ///
    /// Returns the error from finalizing the source.
    pub fn finish(&self) -> Result<()> {
        let result = lock(&self.source).finish();
        tracing::info!(collections = self.collections(), "sampler finished");
        result
    }

    /// Ticks every `period` until `stop` is set or the source runs out.
    ///
    /// # Errors
    ///
    /// Returns the first collection error under [`ErrorPolicy::Terminate`].
    pub fn run(&self, period: Duration, stop: &AtomicBool) -> Result<()> {
        let mut ticker = Ticker::new(period, Instant::now());
        while !stop.load(Ordering::SeqCst) {
            let now = Instant::now();
            if ticker.poll(now).is_none() {
                thread::sleep(ticker.time_until(now).min(STOP_POLL_INTERVAL));
                continue;
            }
            if self.tick()? == TickOutcome::Exhausted {
                break;
            }
            if let Some(delay) = self.next_delay() {
                ticker.reschedule(delay, Instant::now());
            }
        }
        Ok(())
    }

    #[allow(clippy::significant_drop_tightening)]
    fn collect(&self) -> Result<TickOutcome> {
        let mut source = match self.source.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                tracing::debug!("collection in flight, request coalesced");
                return Ok(TickOutcome::Coalesced);
            }
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        let _ = self.collections.fetch_add(1, Ordering::SeqCst);
        let started = Instant::now();

        // The source stays locked until the sample reached `latest` and every
        // sink, so deliveries follow collection order.
        match source.collect() {
            Ok(Some(sample)) => {
                let sample = Arc::new(sample);
                tracing::trace!(
                    elapsed_ms = started.elapsed().as_millis(),
                    sockets = sample.snapshot.connections.len(),
                    "collection complete"
                );
                *self.latest.write().unwrap_or_else(PoisonError::into_inner) =
                    Some(Arc::clone(&sample));
                for sink in lock(&self.sinks).iter_mut() {
                    sink.deliver(&sample);
                }
                Ok(TickOutcome::Delivered(sample))
            }
            Ok(None) => {
                if !self.exhausted.swap(true, Ordering::SeqCst) {
                    tracing::info!(kind = %self.kind, "source exhausted");
                }
                Ok(TickOutcome::Exhausted)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => match self.policy {
                ErrorPolicy::Terminate => Err(e),
                ErrorPolicy::SkipTick => {
                    tracing::warn!(error = %e, "collection failed, tick skipped");
                    Ok(TickOutcome::Skipped)
                }
            },
        }
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
