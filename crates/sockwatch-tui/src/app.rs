//! TUI application state machine.
//!
//! Holds the latest delivered sample, the active view, the selection and
//! the status flags the header shows. The main loop feeds it samples and
//! actions; rendering only reads it.

use std::sync::Arc;
use std::sync::mpsc::Receiver;

use sockwatch_core::net::ConnectionRecord;
use sockwatch_core::users::UserNames;
use sockwatch_runtime::snapshot::Sample;
use sockwatch_runtime::source::SourceKind;

/// Which view the TUI is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Sockets held by the monitored process.
    Target,
    /// Every socket on the host.
    Connections,
}

impl View {
    const ALL: [Self; 2] = [Self::Target, Self::Connections];

    /// Tab title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Target => "Target",
            Self::Connections => "All sockets",
        }
    }

    /// Position in the tab bar.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Target => 0,
            Self::Connections => 1,
        }
    }

    /// Every view, in tab order.
    #[must_use]
    pub const fn all() -> [Self; 2] {
        Self::ALL
    }

    const fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    const fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// One table row, formatted for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRow {
    /// Kernel inode.
    pub inode: u64,
    /// Family label.
    pub protocol: String,
    /// Endpoints or path, as the record renders itself.
    pub summary: String,
    /// State or socket type label.
    pub info: String,
    /// Owning user, `-` where the table has no owner column.
    pub user: String,
}

/// Root application state for the TUI.
#[derive(Debug)]
pub struct App {
    /// Whether the app should continue running.
    pub running: bool,
    /// Current active view.
    pub current_view: View,
    /// Index of the selected row in the current view.
    pub selected_index: usize,
    /// Whether the sampler is paused.
    pub paused: bool,
    /// Origin of the samples.
    pub source: SourceKind,
    /// Whether a replayed session has run out.
    pub finished: bool,
    /// Last error or notice shown in the status bar.
    pub status: Option<String>,
    latest: Option<Arc<Sample>>,
    rows: Vec<ConnectionRow>,
    users: UserNames,
}

impl App {
    /// Creates a new application state.
    #[must_use]
    pub fn new(source: SourceKind) -> Self {
        Self {
            running: true,
            current_view: View::Target,
            selected_index: 0,
            paused: false,
            source,
            finished: false,
            status: None,
            latest: None,
            rows: Vec::new(),
            users: UserNames::new(),
        }
    }

    /// Signals the app to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Replaces the displayed sample.
    pub fn update(&mut self, sample: Arc<Sample>) {
        self.latest = Some(sample);
        self.rebuild_rows();
    }

    /// Takes every pending sample from `rx` and keeps the newest.
    ///
    /// Returns how many samples were pending.
    pub fn drain(&mut self, rx: &Receiver<Arc<Sample>>) -> usize {
        let mut pending = 0;
        let mut newest = None;
        for sample in rx.try_iter() {
            pending += 1;
            newest = Some(sample);
        }
        if let Some(sample) = newest {
            self.update(sample);
        }
        pending
    }

    /// The displayed sample.
    #[must_use]
    pub fn latest(&self) -> Option<&Sample> {
        self.latest.as_deref()
    }

    /// PID of the monitored process in the displayed sample.
    #[must_use]
    pub fn target_pid(&self) -> Option<u32> {
        self.latest()?.snapshot.target.as_ref().map(|t| t.pid)
    }

    /// Rows of the current view.
    #[must_use]
    pub fn rows(&self) -> &[ConnectionRow] {
        &self.rows
    }

    /// Switches to the next view.
    pub fn next_view(&mut self) {
        self.set_view(self.current_view.next());
    }

    /// Switches to the previous view.
    pub fn prev_view(&mut self) {
        self.set_view(self.current_view.prev());
    }

    /// Moves the selection up, wrapping to the bottom.
    pub fn select_prev(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        self.selected_index = self
            .selected_index
            .checked_sub(1)
            .unwrap_or(self.rows.len() - 1);
    }

    /// Moves the selection down, wrapping to the top.
    pub fn select_next(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        self.selected_index = (self.selected_index + 1) % self.rows.len();
    }

    /// Shows `message` in the status bar.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    fn set_view(&mut self, view: View) {
        if view != self.current_view {
            self.current_view = view;
            self.selected_index = 0;
            self.rebuild_rows();
        }
    }

    fn rebuild_rows(&mut self) {
        let Some(sample) = self.latest.clone() else {
            self.rows.clear();
            return;
        };
        let snapshot = &sample.snapshot;
        let records: Vec<&ConnectionRecord> = match self.current_view {
            View::Target => snapshot.target_connections(),
            View::Connections => snapshot.connections.iter().collect(),
        };
        self.rows = records.into_iter().map(|r| self.row(r)).collect();
        if self.selected_index >= self.rows.len() {
            self.selected_index = self.rows.len().saturating_sub(1);
        }
    }

    fn row(&mut self, record: &ConnectionRecord) -> ConnectionRow {
        let user = if record.local.is_some() {
            self.users.name(record.uid)
        } else {
            "-".to_string()
        };
        let summary = record.to_string();
        let prefix = format!("({}) ", record.protocol);
        ConnectionRow {
            inode: record.inode,
            protocol: record.protocol.to_string(),
            summary: summary
                .strip_prefix(&prefix)
                .map_or_else(|| summary.clone(), str::to_string),
            info: record.info().to_string(),
            user,
        }
    }
}
