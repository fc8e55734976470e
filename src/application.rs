//! Top-level window stack and the run loop.
//!
//! The application owns the component tree, the only [`Mailbox`] and the
//! window list. Input is read on a separate `input-poller` thread and reaches
//! the loop through the bus like every other message.

use std::collections::VecDeque;
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::bus::{self, Bus, Mailbox};
use crate::config::ApplicationConfig;
use crate::error::{Error, Result};
use crate::message::{Handle, Message, MessageKind};
use crate::terminal::{Cell, EventSource, InputEvent, MouseButtons, MouseEvent, Surface};
use crate::tree::ComponentTree;

/// How long the poller waits for input before checking for shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Not started yet.
    Idle,
    Running,
    /// The loop exits before the next receive.
    Terminating,
}

/// Cell under the textual pointer, kept so it can be restored.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    x: i32,
    y: i32,
    saved: Cell,
}

impl Cursor {
    fn stamped(&self) -> Cell {
        Cell {
            ch: self.saved.ch,
            style: self.saved.style.reversed(),
        }
    }
}

/// Pointer bookkeeping carried between samples.
#[derive(Debug, Default)]
struct Pointer {
    buttons: MouseButtons,
    hovered: Option<Handle>,
    cursor: Option<Cursor>,
}

const BUTTONS: [(MouseButtons, MessageKind, MessageKind); 2] = [
    (
        MouseButtons::LEFT,
        MessageKind::MouseLeftDown,
        MessageKind::MouseLeftUp,
    ),
    (
        MouseButtons::RIGHT,
        MessageKind::MouseRightDown,
        MessageKind::MouseRightUp,
    ),
];

pub struct Application {
    config: ApplicationConfig,
    tree: ComponentTree,
    bus: Bus,
    mailbox: Mailbox,
    events: Option<Box<dyn EventSource>>,
    /// Front is the focused window.
    windows: VecDeque<Handle>,
    main_window: Option<Handle>,
    state: State,
    initialized: bool,
    pointer: Pointer,
    /// Set when the surface changed outside the canvas chain.
    needs_sync: bool,
}

impl Application {
    pub fn new(
        config: ApplicationConfig,
        surface: impl Surface + 'static,
        events: impl EventSource + 'static,
    ) -> Self {
        let (bus, mailbox) = bus::bounded(config.bus_capacity);
        let tree = ComponentTree::new(bus.clone(), Box::new(surface), config.screen_style);
        Self {
            config,
            tree,
            bus,
            mailbox,
            events: Some(Box::new(events)),
            windows: VecDeque::new(),
            main_window: None,
            state: State::Idle,
            initialized: false,
            pointer: Pointer::default(),
            needs_sync: false,
        }
    }

    pub fn config(&self) -> &ApplicationConfig {
        &self.config
    }

    pub fn tree(&self) -> &ComponentTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ComponentTree {
        &mut self.tree
    }

    /// Sender side of the message bus, for other threads.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Front to back.
    pub fn windows(&self) -> impl Iterator<Item = Handle> + '_ {
        self.windows.iter().copied()
    }

    pub fn focused_window(&self) -> Option<Handle> {
        self.windows.front().copied()
    }

    pub fn main_window(&self) -> Option<Handle> {
        self.main_window
    }

    /// Puts a top-level view at the front of the window list. The first
    /// window added becomes the main window.
    pub fn add_window(&mut self, window: Handle) -> Result<()> {
        if self.tree.view(window).is_none() {
            return Err(Error::UnknownNode(window));
        }
        self.windows.retain(|w| *w != window);
        self.windows.push_front(window);
        if self.main_window.is_none() {
            self.main_window = Some(window);
        }
        debug!(%window, count = self.windows.len(), "add window");
        Ok(())
    }

    /// Destroying the main window terminates the application.
    pub fn set_main_window(&mut self, window: Handle) -> Result<()> {
        if !self.windows.contains(&window) {
            return Err(Error::UnknownNode(window));
        }
        self.main_window = Some(window);
        Ok(())
    }

    /// Prepares the surface. Must succeed before [`Application::run`].
    pub fn init(&mut self) -> Result<()> {
        if self.main_window.is_none() {
            return Err(Error::NoMainWindow);
        }
        self.tree.set_screen_brush(self.config.screen_style);
        let surface = self.tree.surface_mut();
        surface.init()?;
        surface.enable_mouse_reporting()?;
        self.initialized = true;
        debug!("application initialized");
        Ok(())
    }

    /// Runs until a quit request, the quit key or destruction of the main
    /// window. The input poller is joined and the surface shut down before
    /// returning, so a second run needs a new application.
    pub fn run(&mut self) -> Result<()> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        let Some(events) = self.events.take() else {
            return Err(Error::NotInitialized);
        };

        self.start();
        let stop = Arc::new(AtomicBool::new(false));
        let result = match spawn_poller(events, self.bus.clone(), stop.clone()) {
            Ok(poller) => {
                let result = self.event_loop();
                stop.store(true, Ordering::Relaxed);
                // Releases a poller blocked on a full bus.
                self.mailbox.close();
                if poller.join().is_err() {
                    warn!("input poller panicked");
                }
                result
            }
            Err(err) => Err(err),
        };

        self.tree.surface_mut().shutdown();
        self.initialized = false;
        info!(state = ?self.state, "application stopped");
        result
    }

    /// Processes queued messages without blocking and returns how many were
    /// handled. Starts the application first if it is idle.
    pub fn drain(&mut self) -> Result<usize> {
        if self.state == State::Idle {
            self.start();
        }
        let mut handled = 0;
        while self.state == State::Running {
            let Some(msg) = self.mailbox.try_receive() else {
                break;
            };
            self.dispatch(msg);
            self.sync()?;
            handled += 1;
        }
        Ok(handled)
    }

    fn start(&mut self) {
        self.tree.surface_mut().clear();
        if let Some(front) = self.focused_window() {
            self.set_focused(front, true);
        }
        self.bus.post(Message::draw(Handle::APPLICATION));
        self.state = State::Running;
        debug!(windows = self.windows.len(), "application start");
    }

    fn event_loop(&mut self) -> Result<()> {
        while self.state == State::Running {
            let Some(msg) = self.mailbox.receive() else {
                break;
            };
            self.dispatch(msg);
            self.sync()?;
        }
        Ok(())
    }

    fn terminate(&mut self, reason: &str) {
        info!(reason, "application terminating");
        self.state = State::Terminating;
    }

    /// Flushes the surface if this iteration drew anything.
    fn sync(&mut self) -> Result<()> {
        let painted = self.tree.take_painted();
        let pending = mem::take(&mut self.needs_sync);
        if painted || pending {
            if painted {
                self.restamp_cursor();
            }
            self.tree.surface_mut().sync()?;
        }
        Ok(())
    }

    fn dispatch(&mut self, msg: Message) {
        trace!(target = %msg.target, kind = ?msg.kind, "dispatch");

        if msg.kind == MessageKind::Key {
            let quit = self.config.exit_on_ctrl_c
                && msg
                    .key_event()
                    .is_some_and(|key| self.config.quit_key.matches(key));
            if quit {
                self.terminate("quit key");
            } else if let Some(front) = self.focused_window() {
                self.tree.handle_message(front, &msg);
            }
            return;
        }

        if msg.target == Handle::APPLICATION {
            self.handle_own(msg);
            return;
        }

        if msg.kind == MessageKind::ScreenResize && msg.is_broadcast() {
            if let Some(screen) = msg.bounds() {
                let width = screen.width.clamp(0, u16::MAX as i32) as u16;
                let height = screen.height.clamp(0, u16::MAX as i32) as u16;
                debug!(width, height, "screen resize");
                self.tree.surface_mut().resize(width, height);
                self.pointer.cursor = None;
            }
            self.deliver(&msg);
            self.bus.post(Message::draw(Handle::APPLICATION));
            return;
        }

        self.deliver(&msg);
    }

    /// Broadcasts reach every window back to front. Targeted messages stop at
    /// the window whose subtree holds the target.
    fn deliver(&mut self, msg: &Message) {
        if msg.is_broadcast() {
            let windows: Vec<Handle> = self.windows.iter().rev().copied().collect();
            for window in windows {
                self.tree.handle_message(window, msg);
            }
            return;
        }

        let windows: Vec<Handle> = self.windows.iter().copied().collect();
        let claimed = windows
            .iter()
            .position(|window| self.tree.handle_message(*window, msg));
        match claimed {
            // A window behind the front one painted over the windows above it.
            Some(index) if index > 0 && self.tree.is_painted() => {
                self.repaint(&windows[..index]);
            }
            Some(_) => {}
            // Detached nodes are still addressable.
            None if self.tree.contains(msg.target) => {
                self.tree.handle_message(msg.target, msg);
            }
            None => trace!(target = %msg.target, kind = ?msg.kind, "message unclaimed"),
        }
    }

    /// Repaints `windows`, given front to back, in back to front order.
    fn repaint(&mut self, windows: &[Handle]) {
        for window in windows.iter().rev() {
            self.tree.handle_message(*window, &Message::draw(*window));
        }
    }

    fn handle_own(&mut self, msg: Message) {
        match msg.kind {
            MessageKind::Draw => self.redraw(),
            MessageKind::Quit => self.terminate("quit message"),
            MessageKind::MouseMove => {
                if let Some(event) = msg.mouse_event() {
                    self.resolve_pointer(event);
                }
            }
            MessageKind::Create => {
                if let Some(window) = msg.node() {
                    self.create_window(window);
                }
            }
            MessageKind::Destroy => {
                if let Some(window) = msg.node() {
                    self.destroy_window(window);
                }
            }
            kind => trace!(?kind, "ignored application message"),
        }
    }

    /// Clears the screen and paints every window back to front.
    fn redraw(&mut self) {
        self.tree.surface_mut().clear();
        let style = self.config.screen_style;
        let mut screen = self.tree.screen_painter();
        let area = screen.area();
        screen.set_brush(style).fill(area);

        let windows: Vec<Handle> = self.windows.iter().copied().collect();
        self.repaint(&windows);
    }

    fn set_focused(&mut self, window: Handle, focused: bool) {
        if let Some(view) = self.tree.view_mut(window) {
            view.set_focused(focused);
        }
    }

    fn create_window(&mut self, window: Handle) {
        if self.tree.view(window).is_none() {
            trace!(%window, "create for unknown window");
            return;
        }
        let previous = self.focused_window();
        if self.add_window(window).is_err() {
            return;
        }
        self.move_focus(previous, window);
    }

    fn destroy_window(&mut self, window: Handle) {
        let Some(index) = self.windows.iter().position(|w| *w == window) else {
            trace!(%window, "destroy for window not in list");
            return;
        };
        self.windows.remove(index);
        if let Err(err) = self.tree.destroy(window) {
            trace!(%err, "window already gone from tree");
        }
        if self.pointer.hovered == Some(window) {
            self.pointer.hovered = None;
        }
        debug!(%window, count = self.windows.len(), "destroy window");

        if self.main_window == Some(window) {
            self.main_window = None;
            self.terminate("main window destroyed");
            return;
        }
        if index == 0 {
            if let Some(front) = self.focused_window() {
                self.set_focused(front, true);
                self.bus.post(Message::activate(front));
            }
        }
        self.bus.post(Message::draw(Handle::APPLICATION));
    }

    /// Moves `window` to the front and swaps the focus flags, then asks the
    /// old front to deactivate and the new one to activate.
    fn focus(&mut self, window: Handle) {
        let previous = self.focused_window();
        if previous == Some(window) {
            return;
        }
        self.windows.retain(|w| *w != window);
        self.windows.push_front(window);
        self.move_focus(previous, window);
    }

    fn move_focus(&mut self, previous: Option<Handle>, window: Handle) {
        if let Some(previous) = previous.filter(|p| *p != window) {
            self.set_focused(previous, false);
            self.bus.post(Message::deactivate(previous));
        }
        self.set_focused(window, true);
        self.bus.post(Message::activate(window));
        debug!(%window, ?previous, "focus window");
    }

    /// First visible window, front to back, containing the point.
    fn window_at(&self, x: i32, y: i32) -> Option<Handle> {
        self.windows.iter().copied().find(|window| {
            self.tree
                .view(*window)
                .is_some_and(|view| view.visible() && view.bounds().contains(x, y))
        })
    }

    fn resolve_pointer(&mut self, event: MouseEvent) {
        let previous = self.pointer.buttons;
        let mut clicked = false;

        for (button, down, up) in BUTTONS {
            let pressed = event.buttons.contains(button);
            let was_pressed = previous.contains(button);
            if pressed && !was_pressed {
                self.button_down(event, down);
                clicked = true;
            } else if !pressed && was_pressed {
                self.button_up(event, up);
                clicked = true;
            }
        }

        if !clicked {
            self.hover(event);
        }
        if self.config.show_mouse_cursor {
            self.move_cursor(event.x, event.y);
        }
        self.pointer.buttons = event.buttons;
    }

    fn button_down(&mut self, event: MouseEvent, kind: MessageKind) {
        let Some(window) = self.window_at(event.x, event.y) else {
            trace!(x = event.x, y = event.y, "click outside every window");
            return;
        };
        if self.focused_window() == Some(window) {
            self.bus.post(Message::click(window, kind, event));
        } else {
            self.focus(window);
        }
    }

    fn button_up(&mut self, event: MouseEvent, kind: MessageKind) {
        if let Some(window) = self.window_at(event.x, event.y) {
            self.bus.post(Message::click(window, kind, event));
        }
    }

    fn hover(&mut self, event: MouseEvent) {
        let current = self.window_at(event.x, event.y);
        let last = self.pointer.hovered;
        if current == last {
            return;
        }
        if let Some(last) = last {
            self.bus.post(Message::mouse_leave(last));
        }
        if let Some(current) = current {
            self.bus.post(Message::mouse_enter(current, event.x, event.y));
        }
        self.pointer.hovered = current;
    }

    fn move_cursor(&mut self, x: i32, y: i32) {
        if let Some(cursor) = self.pointer.cursor {
            if (cursor.x, cursor.y) == (x, y) {
                return;
            }
            self.restore_cell(cursor.x, cursor.y, cursor.saved);
        }
        self.pointer.cursor = self.tree.surface().cell(x, y).map(|saved| Cursor { x, y, saved });
        if let Some(cursor) = self.pointer.cursor {
            self.restore_cell(x, y, cursor.stamped());
        }
        self.needs_sync = true;
    }

    /// A redraw may have painted over the cursor cell.
    fn restamp_cursor(&mut self) {
        let Some(cursor) = self.pointer.cursor else {
            return;
        };
        let current = self.tree.surface().cell(cursor.x, cursor.y);
        if current == Some(cursor.stamped()) {
            return;
        }
        let Some(saved) = current else {
            self.pointer.cursor = None;
            return;
        };
        let cursor = Cursor { saved, ..cursor };
        self.restore_cell(cursor.x, cursor.y, cursor.stamped());
        self.pointer.cursor = Some(cursor);
    }

    fn restore_cell(&mut self, x: i32, y: i32, cell: Cell) {
        self.tree.surface_mut().set_cell(x, y, cell.ch, cell.style);
    }
}

fn spawn_poller(
    events: Box<dyn EventSource>,
    bus: Bus,
    stop: Arc<AtomicBool>,
) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("input-poller".to_string())
        .spawn(move || poll_input(events, bus, stop))?;
    Ok(handle)
}

/// Forwards decoded input until `stop` is set, the source fails or the bus
/// closes.
fn poll_input(mut events: Box<dyn EventSource>, bus: Bus, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::Relaxed) {
        let msg = match events.poll_event(POLL_INTERVAL) {
            Ok(None) => continue,
            Ok(Some(InputEvent::Key(key))) => Message::key(key),
            Ok(Some(InputEvent::Mouse(mouse))) => Message::mouse(mouse),
            Ok(Some(InputEvent::Resize(width, height))) => Message::screen_resize(width, height),
            Err(err) => {
                warn!(%err, "input polling stopped");
                return;
            }
        };
        if bus.send(msg).is_err() {
            debug!("bus closed, input poller exiting");
            return;
        }
    }
}
