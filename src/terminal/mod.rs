//! Terminal back-end seam.
//!
//! The toolkit never talks to a terminal directly. Drawing goes through a
//! [`Surface`] owned by the run loop, and input arrives from an [`EventSource`]
//! that lives on its own polling thread.

use std::time::Duration;

use crossterm::event::{KeyEvent, KeyModifiers};
use crossterm::style::{Attribute, Attributes, Color};

use crate::error::Result;

pub mod backend;
pub mod buffer;
pub mod headless;

pub use backend::{CrosstermEvents, CrosstermSurface};
pub use buffer::CellBuffer;
pub use headless::{EventScript, HeadlessSurface, ScriptedEvents};

/// Foreground/background pair plus text attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    pub foreground: Color,
    pub background: Color,
    pub attributes: Attributes,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            foreground: Color::Reset,
            background: Color::Reset,
            attributes: Attributes::default(),
        }
    }
}

impl Style {
    pub fn new(foreground: Color, background: Color) -> Self {
        Self {
            foreground,
            background,
            attributes: Attributes::default(),
        }
    }

    pub fn reversed(mut self) -> Self {
        self.attributes.set(Attribute::Reverse);
        self
    }

    pub fn is_reversed(&self) -> bool {
        self.attributes.has(Attribute::Reverse)
    }
}

/// A single character cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub style: Style,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            style: Style::default(),
        }
    }
}

/// Mask of pressed pointer buttons for one pointer sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct MouseButtons(u8);

impl MouseButtons {
    pub const NONE: MouseButtons = MouseButtons(0);
    pub const LEFT: MouseButtons = MouseButtons(1);
    pub const RIGHT: MouseButtons = MouseButtons(1 << 1);
    pub const MIDDLE: MouseButtons = MouseButtons(1 << 2);

    pub fn contains(self, other: MouseButtons) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn insert(&mut self, other: MouseButtons) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: MouseButtons) {
        self.0 &= !other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for MouseButtons {
    type Output = MouseButtons;

    fn bitor(self, rhs: MouseButtons) -> MouseButtons {
        MouseButtons(self.0 | rhs.0)
    }
}

/// Pointer sample: absolute screen position plus the full button mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub x: i32,
    pub y: i32,
    pub buttons: MouseButtons,
    pub modifiers: KeyModifiers,
}

impl MouseEvent {
    pub fn new(x: i32, y: i32, buttons: MouseButtons) -> Self {
        Self {
            x,
            y,
            buttons,
            modifiers: KeyModifiers::NONE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
}

/// Physical screen the canvas chain terminates at.
pub trait Surface {
    fn init(&mut self) -> Result<()>;

    fn shutdown(&mut self);

    fn clear(&mut self);

    /// Flush pending cell changes to the display.
    fn sync(&mut self) -> Result<()>;

    fn size(&self) -> (u16, u16);

    fn resize(&mut self, width: u16, height: u16);

    /// Writes outside the screen are dropped.
    fn set_cell(&mut self, x: i32, y: i32, ch: char, style: Style);

    fn cell(&self, x: i32, y: i32) -> Option<Cell>;

    fn enable_mouse_reporting(&mut self) -> Result<()>;
}

/// Source of decoded terminal input.
pub trait EventSource: Send {
    /// Waits up to `timeout` for the next event. `Ok(None)` when nothing
    /// arrived in time; errors end polling.
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>>;
}
