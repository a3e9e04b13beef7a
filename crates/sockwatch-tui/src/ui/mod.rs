//! Dashboard rendering.

mod connections;
mod dashboard;

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};

use crate::app::App;

/// Draws the whole dashboard for the current app state.
pub fn render(frame: &mut Frame, app: &App) {
    let [tabs, body, status] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    dashboard::render_tabs(frame, app, tabs);
    connections::render_connections(frame, app, body);
    dashboard::render_status_bar(frame, app, status);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use sockwatch_common::types::Protocol;
    use sockwatch_core::net::{ConnectionIndex, ConnectionRecord};
    use sockwatch_runtime::snapshot::{Sample, Snapshot, TargetSockets};
    use sockwatch_runtime::source::SourceKind;

    use super::*;

    fn screen(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 12)).unwrap();
        let _ = terminal.draw(|frame| render(frame, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(ratatui::buffer::Cell::symbol)
            .collect()
    }

    fn sample() -> Arc<Sample> {
        let index: ConnectionIndex = [ConnectionRecord {
            local: Some("127.0.0.1:5037".parse().unwrap()),
            state: 0x0A,
            ..ConnectionRecord::new(Protocol::Tcp, 77)
        }]
        .into_iter()
        .collect();
        let mut snapshot = Snapshot::new(index);
        snapshot.target = Some(TargetSockets {
            pid: 314,
            inodes: vec![77],
        });
        Arc::new(Sample {
            timestamp: Utc::now(),
            snapshot,
        })
    }

    #[test]
    fn empty_app_waits_for_data() {
        let app = App::new(SourceKind::Live);
        let text = screen(&app);
        assert!(text.contains("Waiting for the first snapshot"));
        assert!(text.contains("RUNNING"));
    }

    #[test]
    fn target_rows_are_drawn() {
        let mut app = App::new(SourceKind::Live);
        app.update(sample());
        let text = screen(&app);
        assert!(text.contains("Sockets of pid 314"));
        assert!(text.contains("127.0.0.1:5037"));
        assert!(text.contains("LISTEN"));
    }

    #[test]
    fn paused_state_and_status_are_shown() {
        let mut app = App::new(SourceKind::Replay);
        app.paused = true;
        app.set_status("collection failed");
        let text = screen(&app);
        assert!(text.contains("PAUSED"));
        assert!(text.contains("collection failed"));
        assert!(text.contains("replay"));
    }
}
