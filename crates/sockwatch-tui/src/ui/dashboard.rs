//! Dashboard frame: view tabs on top, status bar at the bottom.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Tabs};

use crate::app::{App, View};

const KEY_HELP: &str = "q quit  space pause  f refresh  ←/→ view  ↑/↓ select";

/// Renders the view tabs with the sampling state in the title.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = View::all()
        .into_iter()
        .map(|view| Line::from(view.title()))
        .collect();
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" sockwatch ({}) ", app.source)),
        )
        .select(app.current_view.index())
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .fg(Color::Yellow),
        );
    frame.render_widget(tabs, area);
}

/// Renders the one-line status bar.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let state = if app.finished {
        Span::styled(" FINISHED ", Style::default().fg(Color::Black).bg(Color::Blue))
    } else if app.paused {
        Span::styled(" PAUSED ", Style::default().fg(Color::Black).bg(Color::Yellow))
    } else {
        Span::styled(" RUNNING ", Style::default().fg(Color::Black).bg(Color::Green))
    };

    let mut spans = vec![state, Span::raw(" ")];
    if let Some(sample) = app.latest() {
        spans.push(Span::raw(format!(
            "{}  {} sockets  ",
            sample.timestamp.format("%H:%M:%S%.3f"),
            sample.snapshot.connections.len()
        )));
    }
    if let Some(pid) = app.target_pid() {
        spans.push(Span::raw(format!("pid {pid}  ")));
    }
    match &app.status {
        Some(message) => spans.push(Span::styled(message.clone(), Style::default().fg(Color::Red))),
        None => spans.push(Span::styled(KEY_HELP, Style::default().fg(Color::DarkGray))),
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
