//! Client configuration

use std::time::Duration;

use rosapi_core::constants::{DEFAULT_LISTEN_QUEUE, DEFAULT_MAX_WORD_LEN, DEFAULT_TIMEOUT};

/// Client options
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use rosapi::ClientConfig;
///
/// let config = ClientConfig::default()
///     .with_timeout(Duration::from_secs(10))
///     .with_async(true);
/// assert_eq!(config.timeout, Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Deadline for each read and write, and for each wait on an async
    /// command between two of its sentences. Zero disables it.
    pub timeout: Duration,

    /// Capacity of the row queue of a listen command. A listen whose
    /// consumer falls this far behind is ended with an overflow error.
    pub listen_queue: usize,

    /// Longest word accepted from the device, in bytes
    pub max_word_len: usize,

    /// Switch to async mode right after login (dial helpers only)
    pub async_mode: bool,
}

impl ClientConfig {
    /// Set I/O and async wait timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set listen queue capacity
    pub fn with_listen_queue(mut self, capacity: usize) -> Self {
        self.listen_queue = capacity;
        self
    }

    /// Set the longest word accepted from the device
    pub fn with_max_word_len(mut self, max_word_len: usize) -> Self {
        self.max_word_len = max_word_len;
        self
    }

    /// Enable async mode after login
    pub fn with_async(mut self, enabled: bool) -> Self {
        self.async_mode = enabled;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            listen_queue: DEFAULT_LISTEN_QUEUE,
            max_word_len: DEFAULT_MAX_WORD_LEN,
            async_mode: false,
        }
    }
}
