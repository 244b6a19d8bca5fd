//! Transport layer for the RouterOS API
//!
//! Reads and writes sentences over any async byte stream and provides
//! the TCP connector. TLS is supported by implementing [`Connector`] for
//! a connector that wraps the TCP stream.

pub mod error;
pub mod reader;
pub mod tcp;
pub mod writer;

pub use error::{Error, Result};
pub use reader::SentenceReader;
pub use tcp::TcpTransport;
pub use writer::{SentenceGuard, SentenceWriter};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// Bidirectional byte stream a client can run over
pub trait AsyncStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin + ?Sized> AsyncStream for T {}

/// Type-erased stream returned by connectors
pub type BoxedStream = Box<dyn AsyncStream>;

/// Establishes connections to a device
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a new stream to the device
    async fn connect(&self) -> Result<BoxedStream>;

    /// Get remote address
    fn remote_addr(&self) -> String;
}
