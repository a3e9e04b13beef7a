//! Terminal event handling.
//!
//! Captures keyboard and resize events from the terminal and maps keys to
//! the actions the main loop applies to the app and the sampler.

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Terminal input events.
#[derive(Debug, Clone)]
pub enum TerminalEvent {
    /// A key was pressed.
    Key(KeyEvent),
    /// The terminal was resized.
    Resize(u16, u16),
    /// No input arrived before the timeout.
    Tick,
}

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Leave the dashboard.
    Quit,
    /// Pause or resume sampling.
    TogglePause,
    /// Collect immediately.
    ForceRefresh,
    /// Show the next view.
    NextView,
    /// Show the previous view.
    PrevView,
    /// Move the selection up.
    SelectPrev,
    /// Move the selection down.
    SelectNext,
}

/// Maps a key press to an action.
#[must_use]
pub fn action_for(key: &KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match (key.code, key.modifiers) {
        (KeyCode::Char('c'), KeyModifiers::CONTROL) | (KeyCode::Char('q') | KeyCode::Esc, _) => {
            Some(Action::Quit)
        }
        (KeyCode::Char(' ' | 'p'), _) => Some(Action::TogglePause),
        (KeyCode::Char('f' | 'r'), _) => Some(Action::ForceRefresh),
        (KeyCode::Right | KeyCode::Tab, _) => Some(Action::NextView),
        (KeyCode::Left | KeyCode::BackTab, _) => Some(Action::PrevView),
        (KeyCode::Up | KeyCode::Char('k'), _) => Some(Action::SelectPrev),
        (KeyCode::Down | KeyCode::Char('j'), _) => Some(Action::SelectNext),
        _ => None,
    }
}

/// Waits up to `timeout` for the next terminal event.
///
/// # Errors
///
/// Returns an error if the terminal cannot be polled or read.
pub fn next_event(timeout: Duration) -> io::Result<TerminalEvent> {
    if !event::poll(timeout)? {
        return Ok(TerminalEvent::Tick);
    }
    Ok(match event::read()? {
        Event::Key(key) => TerminalEvent::Key(key),
        Event::Resize(width, height) => TerminalEvent::Resize(width, height),
        _ => TerminalEvent::Tick,
    })
}
