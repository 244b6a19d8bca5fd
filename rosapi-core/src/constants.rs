//! Protocol constants

use std::time::Duration;

/// Default API port (plain TCP)
pub const DEFAULT_PORT: u16 = 8728;

/// Default API-SSL port
pub const DEFAULT_TLS_PORT: u16 = 8729;

/// Default I/O and async wait timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default capacity of a listen queue
pub const DEFAULT_LISTEN_QUEUE: usize = 100;

/// Default limit on the length of a received word
pub const DEFAULT_MAX_WORD_LEN: usize = 16 * 1024 * 1024;

/// Prefix of a tag word
pub const TAG_PREFIX: &str = ".tag=";

/// Prefix of an attribute word
pub const ATTRIBUTE_PREFIX: &str = "=";

/// Prefix of a query word
pub const QUERY_PREFIX: &str = "?";

/// Tag prefix for regular commands
pub const COMMAND_TAG_PREFIX: &str = "r";

/// Tag prefix for listen commands
pub const LISTEN_TAG_PREFIX: &str = "l";

/// Reply verbs
pub mod verbs {
    /// Partial result
    pub const RE: &str = "!re";

    /// End of reply
    pub const DONE: &str = "!done";

    /// Command failed
    pub const TRAP: &str = "!trap";

    /// Connection is being closed by the device
    pub const FATAL: &str = "!fatal";
}

/// Attribute keys with protocol meaning
pub mod keys {
    /// Human readable trap or fatal reason
    pub const MESSAGE: &str = "message";

    /// Trap category
    pub const CATEGORY: &str = "category";

    /// Legacy login challenge
    pub const RET: &str = "ret";
}

/// Trap categories
pub mod categories {
    /// Missing item or command
    pub const MISSING: &str = "0";

    /// Argument value failure
    pub const ARGUMENT: &str = "1";

    /// Execution of command interrupted
    pub const INTERRUPTED: &str = "2";

    /// Scripting related failure
    pub const SCRIPTING: &str = "3";

    /// General failure
    pub const GENERAL: &str = "4";

    /// API related failure
    pub const API: &str = "5";

    /// TTY related failure
    pub const TTY: &str = "6";

    /// Value generated with `:return` command
    pub const RETURN: &str = "7";
}
