use std::io::{Stdout, Write, stdout};
use std::time::Duration;

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind, MouseButton,
    MouseEventKind,
};
use crossterm::style::{
    Attribute, Print, SetAttribute, SetAttributes, SetBackgroundColor, SetForegroundColor,
};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{ExecutableCommand, QueueableCommand};
use tracing::{debug, warn};

use crate::color::{ColorLevel, color_level};
use crate::error::Result;
use crate::terminal::{
    Cell, CellBuffer, EventSource, InputEvent, MouseButtons, MouseEvent, Style, Surface,
};

/// Terminal on stdout: raw mode, alternate screen, diff-based flushing.
pub struct CrosstermSurface {
    out: Stdout,
    /// What the terminal currently shows.
    front: CellBuffer,
    /// What the next sync should show.
    back: CellBuffer,
    level: ColorLevel,
    full_redraw: bool,
    active: bool,
    mouse_reporting: bool,
}

impl CrosstermSurface {
    pub fn new() -> Self {
        Self {
            out: stdout(),
            front: CellBuffer::new(0, 0),
            back: CellBuffer::new(0, 0),
            level: ColorLevel::None,
            full_redraw: true,
            active: false,
            mouse_reporting: false,
        }
    }

    fn queue_style(&mut self, style: Style) -> Result<()> {
        self.out.queue(SetAttribute(Attribute::Reset))?;
        self.out.queue(SetAttributes(style.attributes))?;
        if let Some(color) = self.level.adapt(style.foreground) {
            self.out.queue(SetForegroundColor(color))?;
        }
        if let Some(color) = self.level.adapt(style.background) {
            self.out.queue(SetBackgroundColor(color))?;
        }
        Ok(())
    }

    fn restore(&mut self) -> std::io::Result<()> {
        if self.mouse_reporting {
            self.out.execute(DisableMouseCapture)?;
            self.mouse_reporting = false;
        }
        self.out
            .execute(SetAttribute(Attribute::Reset))?
            .execute(Show)?
            .execute(LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }
}

impl Default for CrosstermSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for CrosstermSurface {
    fn init(&mut self) -> Result<()> {
        self.level = color_level();
        let (width, height) = terminal::size()?;
        debug!(width, height, level = ?self.level, "terminal init");

        terminal::enable_raw_mode()?;
        self.active = true;
        self.out
            .execute(EnterAlternateScreen)?
            .execute(Hide)?
            .execute(Clear(ClearType::All))?;

        self.front = CellBuffer::new(width, height);
        self.back = CellBuffer::new(width, height);
        self.full_redraw = true;
        Ok(())
    }

    fn shutdown(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Err(err) = self.restore() {
            warn!(%err, "failed to restore terminal");
        }
        debug!("terminal shutdown");
    }

    fn clear(&mut self) {
        self.back.clear();
    }

    fn sync(&mut self) -> Result<()> {
        if self.full_redraw {
            self.out.queue(Clear(ClearType::All))?;
            self.front = CellBuffer::new(0, 0);
            self.full_redraw = false;
        }

        let changes: Vec<(u16, u16, Cell)> = self.back.diff(&self.front).collect();
        let mut current: Option<Style> = None;
        for (x, y, cell) in changes {
            if current != Some(cell.style) {
                self.queue_style(cell.style)?;
                current = Some(cell.style);
            }
            self.out.queue(MoveTo(x, y))?.queue(Print(cell.ch))?;
        }
        self.out.flush()?;
        self.front = self.back.clone();
        Ok(())
    }

    fn size(&self) -> (u16, u16) {
        self.back.size()
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.back.resize(width, height);
        self.full_redraw = true;
    }

    fn set_cell(&mut self, x: i32, y: i32, ch: char, style: Style) {
        self.back.set(x, y, ch, style);
    }

    fn cell(&self, x: i32, y: i32) -> Option<Cell> {
        self.back.get(x, y)
    }

    fn enable_mouse_reporting(&mut self) -> Result<()> {
        self.out.execute(EnableMouseCapture)?;
        self.mouse_reporting = true;
        Ok(())
    }
}

impl Drop for CrosstermSurface {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Blocking reader of crossterm events.
///
/// Crossterm reports button presses and releases as separate events; this
/// source folds them into a running mask so every sample carries the full
/// button state.
#[derive(Debug, Default)]
pub struct CrosstermEvents {
    buttons: MouseButtons,
}

impl CrosstermEvents {
    pub fn new() -> Self {
        Self::default()
    }

    fn sample(&mut self, event: event::MouseEvent) -> MouseEvent {
        let button = |button: MouseButton| match button {
            MouseButton::Left => MouseButtons::LEFT,
            MouseButton::Right => MouseButtons::RIGHT,
            MouseButton::Middle => MouseButtons::MIDDLE,
        };
        match event.kind {
            MouseEventKind::Down(pressed) | MouseEventKind::Drag(pressed) => {
                self.buttons.insert(button(pressed))
            }
            MouseEventKind::Up(released) => self.buttons.remove(button(released)),
            _ => {}
        }
        MouseEvent {
            x: event.column as i32,
            y: event.row as i32,
            buttons: self.buttons,
            modifiers: event.modifiers,
        }
    }
}

impl EventSource for CrosstermEvents {
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        let event = match event::read()? {
            Event::Key(key) if key.kind != KeyEventKind::Release => Some(InputEvent::Key(key)),
            Event::Mouse(mouse) => Some(InputEvent::Mouse(self.sample(mouse))),
            Event::Resize(width, height) => Some(InputEvent::Resize(width, height)),
            _ => None,
        };
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> event::MouseEvent {
        event::MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn button_mask_tracks_presses_and_releases() {
        let mut events = CrosstermEvents::new();

        let down = events.sample(mouse(MouseEventKind::Down(MouseButton::Left), 4, 2));
        assert_eq!((down.x, down.y), (4, 2));
        assert!(down.buttons.contains(MouseButtons::LEFT));

        let both = events.sample(mouse(MouseEventKind::Down(MouseButton::Right), 5, 2));
        assert_eq!(both.buttons, MouseButtons::LEFT | MouseButtons::RIGHT);

        let moved = events.sample(mouse(MouseEventKind::Moved, 6, 3));
        assert_eq!(moved.buttons, MouseButtons::LEFT | MouseButtons::RIGHT);

        let up = events.sample(mouse(MouseEventKind::Up(MouseButton::Left), 6, 3));
        assert_eq!(up.buttons, MouseButtons::RIGHT);
    }

    #[test]
    fn surface_buffers_until_sync() {
        let mut surface = CrosstermSurface::new();
        surface.resize(3, 1);
        surface.set_cell(1, 0, 'x', Style::default());
        assert_eq!(surface.cell(1, 0).map(|c| c.ch), Some('x'));
        assert_eq!(surface.size(), (3, 1));
        assert!(surface.cell(3, 0).is_none());
    }
}
