//! Socket table shared by the target and host-wide views.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};

use crate::app::{App, View};

/// Renders the rows of the current view.
pub fn render_connections(frame: &mut Frame, app: &App, area: Rect) {
    let title = match (app.current_view, app.target_pid()) {
        (View::Target, Some(pid)) => format!(" Sockets of pid {pid} "),
        (view, _) => format!(" {} ", view.title()),
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    if app.rows().is_empty() {
        let message = if app.latest().is_none() {
            "Waiting for the first snapshot..."
        } else {
            "No sockets"
        };
        let empty = Paragraph::new(message)
            .block(block)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new(["Proto", "Inode", "User", "Info", "Connection"].map(|h| {
        Cell::from(h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    }))
    .bottom_margin(1);

    let rows = app.rows().iter().map(|row| {
        Row::new([
            Cell::from(row.protocol.clone()),
            Cell::from(row.inode.to_string()),
            Cell::from(row.user.clone()),
            Cell::from(row.info.clone()),
            Cell::from(row.summary.clone()),
        ])
    });

    let widths = [
        Constraint::Length(8),
        Constraint::Length(10),
        Constraint::Length(12),
        Constraint::Length(14),
        Constraint::Min(20),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

    let mut state = TableState::default();
    state.select(Some(app.selected_index));
    frame.render_stateful_widget(table, area, &mut state);
}
