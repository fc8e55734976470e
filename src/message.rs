use std::any::Any;
use std::fmt;

use crossterm::event::KeyEvent;
use uuid::Uuid;

use crate::geometry::Rect;
use crate::terminal::MouseEvent;

/// Globally unique identity of a component, generated at construction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(Uuid);

impl Handle {
    /// Addresses every live component.
    pub const BROADCAST: Handle = Handle(Uuid::from_bytes([0xff; 16]));
    /// Addresses the run loop itself, never a tree node.
    pub const APPLICATION: Handle = Handle(Uuid::nil());

    pub fn new() -> Self {
        Handle(Uuid::new_v4())
    }

    pub fn is_reserved(&self) -> bool {
        *self == Handle::BROADCAST || *self == Handle::APPLICATION
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Handle::BROADCAST {
            f.write_str("broadcast")
        } else if *self == Handle::APPLICATION {
            f.write_str("application")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({self})")
    }
}

/// Message kinds with stable numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Empty message, ignored by every built-in handler.
    Null,
    Enable,
    Key,
    ScreenResize,
    /// Targeted at one component it redraws that component and its subtree.
    Draw,
    /// Sent to a parent after changing a child's z-order.
    ZOrderChanged,
    Quit,
    ChangeBounds,
    /// Sent to a timer's parent when the timer has no callback.
    Timer,
    Create,
    Destroy,
    /// Raw pointer sample, resolved by the application.
    MouseMove,
    MouseLeftDown,
    MouseLeftUp,
    MouseRightDown,
    MouseRightUp,
    /// Sent to both the window being activated and the one being deactivated.
    Activate,
    MouseEnter,
    MouseLeave,
    /// Application-defined kind. Codes live at or above [`MessageKind::USER_BASE`].
    User(u32),
}

impl MessageKind {
    pub const USER_BASE: u32 = u32::MAX / 2;

    /// User kind `offset` places above the reserved base.
    pub fn user(offset: u32) -> Self {
        MessageKind::User(Self::USER_BASE.saturating_add(offset))
    }

    pub fn code(self) -> u32 {
        match self {
            MessageKind::Null => 0,
            MessageKind::Enable => 1,
            MessageKind::Key => 2,
            MessageKind::ScreenResize => 3,
            MessageKind::Draw => 4,
            MessageKind::ZOrderChanged => 5,
            MessageKind::Quit => 6,
            MessageKind::ChangeBounds => 7,
            MessageKind::Timer => 8,
            MessageKind::Create => 9,
            MessageKind::Destroy => 10,
            MessageKind::MouseMove => 11,
            MessageKind::MouseLeftDown => 12,
            MessageKind::MouseLeftUp => 13,
            MessageKind::MouseRightDown => 14,
            MessageKind::MouseRightUp => 15,
            MessageKind::Activate => 16,
            MessageKind::MouseEnter => 17,
            MessageKind::MouseLeave => 18,
            MessageKind::User(code) => code,
        }
    }

    /// Built-in kind for `code`; unknown codes below the user range map to `Null`.
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => MessageKind::Enable,
            2 => MessageKind::Key,
            3 => MessageKind::ScreenResize,
            4 => MessageKind::Draw,
            5 => MessageKind::ZOrderChanged,
            6 => MessageKind::Quit,
            7 => MessageKind::ChangeBounds,
            8 => MessageKind::Timer,
            9 => MessageKind::Create,
            10 => MessageKind::Destroy,
            11 => MessageKind::MouseMove,
            12 => MessageKind::MouseLeftDown,
            13 => MessageKind::MouseLeftUp,
            14 => MessageKind::MouseRightDown,
            15 => MessageKind::MouseRightUp,
            16 => MessageKind::Activate,
            17 => MessageKind::MouseEnter,
            18 => MessageKind::MouseLeave,
            code if code >= Self::USER_BASE => MessageKind::User(code),
            _ => MessageKind::Null,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Active,
    Inactive,
}

pub enum Payload {
    None,
    Enabled(bool),
    Bounds(Rect),
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// Pointer position for enter notifications.
    Position(i32, i32),
    Activation(Activation),
    /// Window being created or destroyed.
    Node(Handle),
    Any(Box<dyn Any + Send>),
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::None => f.write_str("None"),
            Payload::Enabled(enabled) => f.debug_tuple("Enabled").field(enabled).finish(),
            Payload::Bounds(rect) => f.debug_tuple("Bounds").field(rect).finish(),
            Payload::Key(key) => f.debug_tuple("Key").field(key).finish(),
            Payload::Mouse(mouse) => f.debug_tuple("Mouse").field(mouse).finish(),
            Payload::Position(x, y) => f.debug_tuple("Position").field(x).field(y).finish(),
            Payload::Activation(activation) => {
                f.debug_tuple("Activation").field(activation).finish()
            }
            Payload::Node(handle) => f.debug_tuple("Node").field(handle).finish(),
            Payload::Any(_) => f.write_str("Any(..)"),
        }
    }
}

#[derive(Debug)]
pub struct Message {
    pub target: Handle,
    pub kind: MessageKind,
    pub payload: Payload,
}

impl Message {
    pub fn new(target: Handle, kind: MessageKind, payload: Payload) -> Self {
        Self {
            target,
            kind,
            payload,
        }
    }

    pub fn empty() -> Self {
        Self::new(Handle::BROADCAST, MessageKind::Null, Payload::None)
    }

    pub fn quit() -> Self {
        Self::new(Handle::APPLICATION, MessageKind::Quit, Payload::None)
    }

    pub fn key(event: KeyEvent) -> Self {
        Self::new(Handle::BROADCAST, MessageKind::Key, Payload::Key(event))
    }

    pub fn screen_resize(width: u16, height: u16) -> Self {
        Self::new(
            Handle::BROADCAST,
            MessageKind::ScreenResize,
            Payload::Bounds(Rect::sized(width as i32, height as i32)),
        )
    }

    /// Raw pointer sample for the application to resolve.
    pub fn mouse(event: MouseEvent) -> Self {
        Self::new(
            Handle::APPLICATION,
            MessageKind::MouseMove,
            Payload::Mouse(event),
        )
    }

    pub fn draw(target: Handle) -> Self {
        Self::new(target, MessageKind::Draw, Payload::None)
    }

    pub fn zorder_changed(parent: Handle) -> Self {
        Self::new(parent, MessageKind::ZOrderChanged, Payload::None)
    }

    pub fn enable(target: Handle, enabled: bool) -> Self {
        Self::new(target, MessageKind::Enable, Payload::Enabled(enabled))
    }

    pub fn change_bounds(target: Handle, bounds: Rect) -> Self {
        Self::new(target, MessageKind::ChangeBounds, Payload::Bounds(bounds))
    }

    pub fn timer(parent: Handle) -> Self {
        Self::new(parent, MessageKind::Timer, Payload::None)
    }

    pub fn create_window(window: Handle) -> Self {
        Self::new(Handle::APPLICATION, MessageKind::Create, Payload::Node(window))
    }

    pub fn destroy_window(window: Handle) -> Self {
        Self::new(
            Handle::APPLICATION,
            MessageKind::Destroy,
            Payload::Node(window),
        )
    }

    pub fn activate(target: Handle) -> Self {
        Self::new(
            target,
            MessageKind::Activate,
            Payload::Activation(Activation::Active),
        )
    }

    pub fn deactivate(target: Handle) -> Self {
        Self::new(
            target,
            MessageKind::Activate,
            Payload::Activation(Activation::Inactive),
        )
    }

    /// Button transition delivered to a window. `kind` is one of the
    /// `MouseLeft*`/`MouseRight*` kinds.
    pub fn click(target: Handle, kind: MessageKind, event: MouseEvent) -> Self {
        Self::new(target, kind, Payload::Mouse(event))
    }

    pub fn mouse_enter(target: Handle, x: i32, y: i32) -> Self {
        Self::new(target, MessageKind::MouseEnter, Payload::Position(x, y))
    }

    pub fn mouse_leave(target: Handle) -> Self {
        Self::new(target, MessageKind::MouseLeave, Payload::None)
    }

    pub fn user<T: Any + Send>(target: Handle, offset: u32, value: T) -> Self {
        Self::new(
            target,
            MessageKind::user(offset),
            Payload::Any(Box::new(value)),
        )
    }

    pub fn is_broadcast(&self) -> bool {
        self.target == Handle::BROADCAST
    }

    pub fn bounds(&self) -> Option<Rect> {
        match self.payload {
            Payload::Bounds(rect) => Some(rect),
            _ => None,
        }
    }

    pub fn enabled(&self) -> Option<bool> {
        match self.payload {
            Payload::Enabled(enabled) => Some(enabled),
            _ => None,
        }
    }

    pub fn mouse_event(&self) -> Option<MouseEvent> {
        match self.payload {
            Payload::Mouse(event) => Some(event),
            _ => None,
        }
    }

    pub fn key_event(&self) -> Option<&KeyEvent> {
        match &self.payload {
            Payload::Key(event) => Some(event),
            _ => None,
        }
    }

    pub fn activation(&self) -> Option<Activation> {
        match self.payload {
            Payload::Activation(activation) => Some(activation),
            _ => None,
        }
    }

    pub fn node(&self) -> Option<Handle> {
        match self.payload {
            Payload::Node(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn value<T: Any>(&self) -> Option<&T> {
        match &self.payload {
            Payload::Any(value) => value.downcast_ref(),
            _ => None,
        }
    }
}
