//! Session management for the API protocol
//!
//! A session represents one connection to a device and tracks:
//! - Execution mode (synchronous or tag-multiplexed asynchronous)
//! - Tag counter (increments per asynchronous command)
//! - Closing state

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// One command in flight, replies read inline
    Synchronous,

    /// Commands tagged and multiplexed by a background reader
    Asynchronous,

    /// Closed; no further commands
    Closed,
}

/// Session manager
///
/// Manages execution mode and tag generation.
/// Thread-safe and can be cloned cheaply (Arc internally).
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    /// Last tag number handed out (0 before the first)
    last_tag: AtomicU64,

    /// Current session state
    state: parking_lot::RwLock<SessionState>,
}

impl Session {
    /// Create a new synchronous session
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionInner {
                last_tag: AtomicU64::new(0),
                state: parking_lot::RwLock::new(SessionState::Synchronous),
            }),
        }
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        *self.inner.state.read()
    }

    /// Check if asynchronous mode is enabled
    pub fn is_async(&self) -> bool {
        matches!(self.state(), SessionState::Asynchronous)
    }

    /// Check if closed
    pub fn is_closed(&self) -> bool {
        matches!(self.state(), SessionState::Closed)
    }

    /// Switch to asynchronous mode
    ///
    /// The switch is permanent. Returns `true` only for the call that
    /// performed it.
    pub fn enable_async(&self) -> Result<bool> {
        let mut state = self.inner.state.write();

        match *state {
            SessionState::Synchronous => {
                *state = SessionState::Asynchronous;
                Ok(true)
            }
            SessionState::Asynchronous => Ok(false),
            SessionState::Closed => Err(Error::InvalidSessionState(
                "Cannot enable async mode on a closed session".into(),
            )),
        }
    }

    /// Close session
    ///
    /// Returns `true` only for the call that closed it.
    pub fn close(&self) -> bool {
        let mut state = self.inner.state.write();

        if *state == SessionState::Closed {
            return false;
        }

        *state = SessionState::Closed;
        true
    }

    /// Get next tag number
    ///
    /// Numbers start at 1 and increase monotonically.
    pub fn next_tag(&self) -> u64 {
        self.inner.last_tag.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Get next tag with a prefix, e.g. `r1`
    pub fn next_tag_with(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.next_tag())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
