//! # rosapi
//!
//! Async client for the MikroTik RouterOS API.
//!
//! ## Features
//!
//! - Async/await API using Tokio
//! - Plain and legacy challenge-response login
//! - Synchronous mode, or tag-multiplexed async mode for concurrent commands
//! - Streaming `listen` commands with cancellation
//! - Pluggable transport through [`Connector`] (e.g. TLS)
//!
//! ## Quick Start
//!
//! ```no_run
//! use rosapi::{Client, Command};
//!
//! #[tokio::main]
//! async fn main() -> rosapi::Result<()> {
//!     let client = Client::dial("192.168.88.1", rosapi::DEFAULT_PORT, "admin", "").await?;
//!
//!     let command = Command::new("/interface/print").proplist(&["name", "running"]);
//!     let reply = client.run_command(command).await?;
//!     println!("{}", reply);
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
mod dispatch;
pub mod error;
pub mod listen;

#[cfg(test)]
mod test_support;

// Re-exports
pub use client::Client;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use listen::ListenReply;

pub use rosapi_core::constants::{DEFAULT_PORT, DEFAULT_TLS_PORT};
pub use rosapi_core::{Command, Verb};
pub use rosapi_transport::{AsyncStream, BoxedStream, Connector, TcpTransport};
pub use rosapi_types::{Pair, Reply, Sentence};
