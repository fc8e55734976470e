//! In-memory back-end.
//!
//! [`HeadlessSurface`] is cheap to clone and every clone looks at the same
//! screen, so a test can keep one while the application owns another.
//! [`ScriptedEvents`] replays input pushed through its [`EventScript`].

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use crossterm::event::KeyEvent;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::terminal::{Cell, CellBuffer, EventSource, InputEvent, MouseEvent, Style, Surface};

struct Screen {
    buffer: CellBuffer,
    fail_init: bool,
    initialized: bool,
    mouse_reporting: bool,
    syncs: usize,
}

#[derive(Clone)]
pub struct HeadlessSurface {
    screen: Arc<Mutex<Screen>>,
}

impl HeadlessSurface {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            screen: Arc::new(Mutex::new(Screen {
                buffer: CellBuffer::new(width, height),
                fail_init: false,
                initialized: false,
                mouse_reporting: false,
                syncs: 0,
            })),
        }
    }

    /// Surface whose `init` fails, like a terminal that cannot be driven.
    pub fn failing(width: u16, height: u16) -> Self {
        let surface = Self::new(width, height);
        surface.screen.lock().fail_init = true;
        surface
    }

    pub fn row_text(&self, y: u16) -> String {
        self.screen.lock().buffer.row_text(y)
    }

    pub fn sync_count(&self) -> usize {
        self.screen.lock().syncs
    }

    pub fn is_initialized(&self) -> bool {
        self.screen.lock().initialized
    }

    pub fn mouse_reporting(&self) -> bool {
        self.screen.lock().mouse_reporting
    }
}

impl Surface for HeadlessSurface {
    fn init(&mut self) -> Result<()> {
        let mut screen = self.screen.lock();
        if screen.fail_init {
            return Err(Error::Backend(io::Error::new(
                io::ErrorKind::Unsupported,
                "terminal not supported",
            )));
        }
        screen.initialized = true;
        Ok(())
    }

    fn shutdown(&mut self) {
        let mut screen = self.screen.lock();
        screen.initialized = false;
        screen.mouse_reporting = false;
    }

    fn clear(&mut self) {
        self.screen.lock().buffer.clear();
    }

    fn sync(&mut self) -> Result<()> {
        self.screen.lock().syncs += 1;
        Ok(())
    }

    fn size(&self) -> (u16, u16) {
        self.screen.lock().buffer.size()
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.screen.lock().buffer.resize(width, height);
    }

    fn set_cell(&mut self, x: i32, y: i32, ch: char, style: Style) {
        self.screen.lock().buffer.set(x, y, ch, style);
    }

    fn cell(&self, x: i32, y: i32) -> Option<Cell> {
        self.screen.lock().buffer.get(x, y)
    }

    fn enable_mouse_reporting(&mut self) -> Result<()> {
        self.screen.lock().mouse_reporting = true;
        Ok(())
    }
}

/// Feeds a [`ScriptedEvents`] source. Dropping every script ends the source.
#[derive(Clone)]
pub struct EventScript {
    events: Sender<InputEvent>,
}

impl EventScript {
    /// Returns `false` once the source is gone.
    pub fn push(&self, event: InputEvent) -> bool {
        self.events.send(event).is_ok()
    }

    pub fn key(&self, event: KeyEvent) -> bool {
        self.push(InputEvent::Key(event))
    }

    pub fn mouse(&self, event: MouseEvent) -> bool {
        self.push(InputEvent::Mouse(event))
    }

    pub fn resize(&self, width: u16, height: u16) -> bool {
        self.push(InputEvent::Resize(width, height))
    }
}

pub struct ScriptedEvents {
    events: Receiver<InputEvent>,
}

impl ScriptedEvents {
    pub fn new() -> (EventScript, ScriptedEvents) {
        let (sender, receiver) = channel::unbounded();
        (
            EventScript { events: sender },
            ScriptedEvents { events: receiver },
        )
    }
}

impl EventSource for ScriptedEvents {
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Error::Backend(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "event script finished",
            ))),
        }
    }
}
