use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::game::Point;
use crate::render::GridLayout;

/// How far one key press moves the fruit, in cells
pub const NUDGE_STEP: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyAction {
    /// Move the fruit by this many cells
    Nudge { dx: f64, dy: f64 },
    Restart,
    Quit,
    None,
}

pub struct InputHandler;

impl InputHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn handle_key_event(&self, key: KeyEvent) -> KeyAction {
        // Handle Ctrl+C
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return KeyAction::Quit;
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => nudge(0.0, -NUDGE_STEP),
            KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => nudge(0.0, NUDGE_STEP),
            KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => nudge(-NUDGE_STEP, 0.0),
            KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => nudge(NUDGE_STEP, 0.0),

            // Controls
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => KeyAction::Quit,
            KeyCode::Char('r') | KeyCode::Char('R') => KeyAction::Restart,

            _ => KeyAction::None,
        }
    }

    /// Pointer position in grid units, or `None` for events that do not
    /// steer the fruit or land outside the board
    pub fn handle_mouse_event(&self, mouse: MouseEvent, layout: &GridLayout) -> Option<Point> {
        match mouse.kind {
            MouseEventKind::Moved | MouseEventKind::Drag(_) | MouseEventKind::Down(_) => {
                layout.to_grid(mouse.column, mouse.row)
            }
            _ => None,
        }
    }
}

fn nudge(dx: f64, dy: f64) -> KeyAction {
    KeyAction::Nudge { dx, dy }
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}
