//! # rosapi-core
//!
//! Core protocol implementation for the RouterOS API.
//!
//! This crate provides the low-level protocol primitives, free of I/O:
//! - Word length prefix encoding/decoding
//! - Sentence encoding and parsing
//! - Command building and reply aggregation
//! - Legacy login challenge-response
//! - Session state and protocol constants

pub mod auth;
pub mod command;
pub mod constants;
pub mod error;
pub mod length;
pub mod reply;
pub mod sentence;
pub mod session;

pub use command::{Command, Verb};
pub use error::{Error, Result};
pub use reply::{ListenProgress, Progress, ReplyCollector};
pub use session::{Session, SessionState};

pub use rosapi_types::{Pair, Reply, Sentence};
