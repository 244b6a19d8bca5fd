//! Error types for rosapi-core

use rosapi_types::Sentence;

use crate::constants::keys;

/// Result type alias for rosapi-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A command word is empty or only whitespace
    #[error("empty word in command")]
    EmptyWord,

    /// Received word does not fit any sentence position
    #[error("invalid sentence word: {0:?}")]
    InvalidWord(String),

    /// First byte of a length prefix uses a reserved marker
    #[error("invalid word length prefix: 0x{0:02X}")]
    InvalidLengthPrefix(u8),

    /// Word does not fit the largest length class
    #[error("word too long: {0} bytes")]
    WordTooLong(usize),

    /// Device rejected the command with `!trap`
    #[error("{}", describe_device_error(.sentence))]
    Device {
        sentence: Sentence,
    },

    /// Device sent `!fatal` and is closing the connection
    #[error("fatal from device: {}", describe_device_error(.sentence))]
    Fatal {
        sentence: Sentence,
    },

    /// Reply sentence with a verb outside the protocol
    #[error("unknown reply word: {sentence}")]
    UnknownReply {
        sentence: Sentence,
    },

    /// Login challenge is not valid hex
    #[error("invalid login challenge: {0}")]
    InvalidChallenge(#[from] hex::FromHexError),

    /// Invalid session state
    #[error("invalid session state: {0}")]
    InvalidSessionState(String),
}

fn describe_device_error(sentence: &Sentence) -> String {
    match sentence.get(keys::MESSAGE) {
        Some(message) => format!("from device: {}", message),
        None => format!("unknown error: {}", sentence),
    }
}

impl Error {
    /// Sentence reported by the device, for trap, fatal and unknown replies
    pub fn sentence(&self) -> Option<&Sentence> {
        match self {
            Self::Device { sentence }
            | Self::Fatal { sentence }
            | Self::UnknownReply { sentence } => Some(sentence),
            _ => None,
        }
    }

    /// Check if error ends the whole connection
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }
}
