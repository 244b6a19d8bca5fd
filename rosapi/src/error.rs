//! High-level error types

use std::sync::Arc;
use std::time::Duration;

use rosapi_types::Sentence;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] rosapi_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] rosapi_transport::Error),

    #[error("Async wait timed out after {timeout:?}")]
    AsyncTimeout { timeout: Duration },

    #[error("Async loop ended")]
    AsyncLoopEnded,

    #[error("Listen queue full after {capacity} unread rows")]
    ListenOverflow { capacity: usize },

    #[error("Connection lost: {0}")]
    ConnectionLost(Arc<Error>),

    #[error("Client is closed")]
    Closed,
}

impl Error {
    /// Trap sentence behind a device error
    pub fn device_sentence(&self) -> Option<&Sentence> {
        match self {
            Self::Core(err @ rosapi_core::Error::Device { .. }) => err.sentence(),
            _ => None,
        }
    }

    /// Check if the device rejected the command with a trap
    pub fn is_device_error(&self) -> bool {
        self.device_sentence().is_some()
    }

    /// Check if the device ended the connection with `!fatal`
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Core(err) => err.is_fatal(),
            Self::ConnectionLost(cause) => cause.is_fatal(),
            _ => false,
        }
    }

    /// Check if a new connection is needed to continue
    pub fn requires_reconnect(&self) -> bool {
        match self {
            Self::Core(err) => err.is_fatal(),
            Self::Transport(_) | Self::ConnectionLost(_) | Self::AsyncLoopEnded | Self::Closed => true,
            Self::AsyncTimeout { .. } | Self::ListenOverflow { .. } => false,
        }
    }
}
