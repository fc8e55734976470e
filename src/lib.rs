//! Retained-mode widget toolkit for character-cell terminals.
//!
//! Components live in a [`ComponentTree`] and talk through a single ordered
//! message [`bus`]. Views paint through chained canvases that clip and
//! translate every cell on its way to the [`terminal::Surface`], and the
//! [`Application`] run loop resolves input against the z-ordered window stack.

pub mod application;
pub mod bus;
pub mod canvas;
pub mod color;
pub mod config;
pub mod error;
pub mod geometry;
pub mod message;
pub mod terminal;
pub mod timer;
pub mod tree;
pub mod view;
pub mod window;
pub mod zorder;

pub use application::{Application, State};
pub use bus::{Bus, Mailbox};
pub use canvas::{CanvasId, Painter};
pub use config::{ApplicationConfig, KeyBinding};
pub use error::{Error, Result};
pub use geometry::Rect;
pub use message::{Activation, Handle, Message, MessageKind, Payload};
pub use tree::{ComponentTree, Context, NodeKind};
pub use view::View;
pub use window::{Border, BorderType, Window};
