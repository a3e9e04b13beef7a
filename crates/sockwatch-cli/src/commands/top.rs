//! `sockwatch top` — Interactive dashboard.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use clap::{Args, ValueEnum};
use ratatui::DefaultTerminal;
use sockwatch_common::config::{ReplayPacing, SourceMode};
use sockwatch_common::constants::WARMUP_COLLECTIONS;
use sockwatch_runtime::sampler::{Sampler, SamplerState, TickOutcome};
use sockwatch_runtime::snapshot::Sample;
use sockwatch_runtime::source::{SourceKind, build_source};
use sockwatch_runtime::ticker::Ticker;
use sockwatch_tui::app::App;
use sockwatch_tui::event::{self, Action, TerminalEvent};
use sockwatch_tui::ui;

use super::MonitorArgs;

/// Arguments for the `top` command.
#[derive(Args, Debug)]
pub struct TopArgs {
    /// Also record every sample to this session file.
    #[arg(long, conflicts_with = "replay")]
    pub record: Option<PathBuf>,

    /// Play back a recorded session instead of reading procfs.
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// How a replayed session is paced.
    #[arg(long, value_enum, default_value_t = Pacing::Tick)]
    pub pacing: Pacing,
}

/// Replay cadence selectable on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// One recorded sample per refresh period.
    Tick,
    /// Wait the recorded gap between samples.
    Recorded,
}

impl From<Pacing> for ReplayPacing {
    fn from(pacing: Pacing) -> Self {
        match pacing {
            Pacing::Tick => Self::PerTick,
            Pacing::Recorded => Self::Recorded,
        }
    }
}

/// Executes the `top` command.
///
/// # Errors
///
/// Returns an error if the target cannot be resolved, the data source
/// cannot be opened, a collection fails under the terminate policy, or the
/// recording aborts.
pub fn execute(args: TopArgs, monitor: &MonitorArgs) -> anyhow::Result<()> {
    let mode = SourceMode::from_paths(args.record, args.replay)?;
    let mut config = monitor.config(mode)?;
    config.pacing = args.pacing.into();

    let target = match config.mode {
        SourceMode::Replay(_) => None,
        _ => Some(super::resolve(&config)?),
    };
    let sampler = Sampler::new(build_source(&config, target)?, config.on_error);
    let (tx, rx) = mpsc::channel::<Arc<Sample>>();
    sampler.register(tx);

    if sampler.source_kind() != SourceKind::Replay {
        warm_up(&sampler)?;
    }

    let mut terminal = ratatui::init();
    let result = run_loop(&mut terminal, &sampler, &rx, config.refresh_period());
    ratatui::restore();

    let finished = sampler.finish();
    result?;
    finished?;
    Ok(())
}

fn warm_up(sampler: &Sampler) -> anyhow::Result<()> {
    for _ in 0..WARMUP_COLLECTIONS {
        let _ = sampler.force_refresh()?;
    }
    tracing::debug!(collections = sampler.collections(), "warm-up done");
    Ok(())
}

fn run_loop(
    terminal: &mut DefaultTerminal,
    sampler: &Sampler,
    rx: &Receiver<Arc<Sample>>,
    period: Duration,
) -> anyhow::Result<()> {
    let mut app = App::new(sampler.source_kind());
    let mut ticker = Ticker::new(period, Instant::now());

    while app.running {
        let _ = app.drain(rx);
        app.paused = sampler.state() == SamplerState::Paused;
        app.finished = sampler.is_exhausted();
        let _ = terminal.draw(|frame| ui::render(frame, &app))?;

        match event::next_event(ticker.time_until(Instant::now()))? {
            TerminalEvent::Key(key) => {
                if let Some(action) = event::action_for(&key) {
                    apply(action, &mut app, sampler)?;
                }
            }
            TerminalEvent::Resize(width, height) => {
                tracing::trace!(width, height, "terminal resized");
            }
            TerminalEvent::Tick => {}
        }

        if ticker.poll(Instant::now()).is_some() && !sampler.is_exhausted() {
            report(sampler.tick()?, &mut app);
            if let Some(delay) = sampler.next_delay() {
                ticker.reschedule(delay, Instant::now());
            }
        }
    }
    Ok(())
}

fn apply(action: Action, app: &mut App, sampler: &Sampler) -> anyhow::Result<()> {
    match action {
        Action::Quit => app.quit(),
        Action::TogglePause => {
            app.paused = sampler.toggle_pause() == SamplerState::Paused;
        }
        Action::ForceRefresh => report(sampler.force_refresh()?, app),
        Action::NextView => app.next_view(),
        Action::PrevView => app.prev_view(),
        Action::SelectPrev => app.select_prev(),
        Action::SelectNext => app.select_next(),
    }
    Ok(())
}

fn report(outcome: TickOutcome, app: &mut App) {
    match outcome {
        TickOutcome::Delivered(_) => app.status = None,
        TickOutcome::Skipped => app.set_status("collection failed, see log"),
        TickOutcome::Exhausted => app.set_status("end of session"),
        TickOutcome::Paused | TickOutcome::Coalesced => {}
    }
}
