/// Terminal input collector.
///
/// Nemery only needs edge-triggered input: a key press moves the cursor or
/// taps once, and a left click taps the tile under the pointer. Everything
/// pending is drained once per frame.

use std::time::Duration;

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton,
    MouseEventKind,
};

pub struct InputState {
    /// Keys pressed during the most recent `drain_events()`.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for modifier checks.
    raw_events: Vec<KeyEvent>,

    /// Left-button clicks as (column, row) in terminal cells.
    clicks: Vec<(u16, u16)>,

    /// Terminal was resized; the renderer must repaint everything.
    pub resized: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            clicks: Vec::with_capacity(4),
            resized: false,
        }
    }

    /// Drain all pending terminal events. Call once per frame.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();
        self.clicks.clear();
        self.resized = false;

        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) => {
                    // Release/Repeat would double-tap on terminals that report them.
                    if key.kind == KeyEventKind::Press {
                        self.fresh_presses.push(key.code);
                        self.raw_events.push(key);
                    }
                }
                Ok(Event::Mouse(m)) => {
                    if let MouseEventKind::Down(MouseButton::Left) = m.kind {
                        self.clicks.push((m.column, m.row));
                    }
                }
                Ok(Event::Resize(_, _)) => self.resized = true,
                _ => {}
            }
        }
    }

    /// Was this key pressed this frame?
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    /// Convenience: was any of these keys pressed?
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    pub fn clicks(&self) -> &[(u16, u16)] {
        &self.clicks
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}
