use thiserror::Error;

use crate::message::Handle;

#[derive(Debug, Error)]
pub enum Error {
    #[error("main window is not set")]
    NoMainWindow,

    #[error("application must be initialized before it runs")]
    NotInitialized,

    #[error("no component with handle {0}")]
    UnknownNode(Handle),

    #[error("{child} cannot be attached under its own descendant {parent}")]
    WouldCycle { parent: Handle, child: Handle },

    #[error("message bus is closed")]
    BusClosed,

    #[error("terminal back-end failure: {0}")]
    Backend(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
