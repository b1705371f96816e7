//! Key bindings and the non-blocking keyboard drain.

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ShiftLeft,
    ShiftRight,
    RotateCw,
    RotateCcw,
    SoftDrop,
    HardDrop,
    Hold,
    Pause,
    Quit,
    None,
}

/// Map key event to game action. Supports both normal (arrows, space) and
/// vim-style (hjkl) bindings.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p') => Action::Pause,
        KeyCode::Left | KeyCode::Char('h') => Action::ShiftLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::ShiftRight,
        KeyCode::Up | KeyCode::Char('x') | KeyCode::Char('k') => Action::RotateCw,
        KeyCode::Char('z') | KeyCode::Char('u') => Action::RotateCcw,
        KeyCode::Down | KeyCode::Char('j') => Action::SoftDrop,
        KeyCode::Enter | KeyCode::Char(' ') => Action::HardDrop,
        KeyCode::Char('c') => Action::Hold,
        _ => Action::None,
    }
}

/// Next pending key press, or None when the queue is drained. Never blocks;
/// non-press events (releases, resizes) are skipped.
pub fn next_key() -> Result<Option<KeyEvent>> {
    while event::poll(Duration::ZERO)? {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                return Ok(Some(key));
            }
        }
    }
    Ok(None)
}
