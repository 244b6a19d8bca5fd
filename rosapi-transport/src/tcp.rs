//! TCP transport

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use rosapi_core::constants::DEFAULT_TIMEOUT;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::{BoxedStream, Connector, error::*};

/// Plain TCP connector for API devices
pub struct TcpTransport {
    addr: String,
    port: u16,
    connect_timeout: Duration,
}

impl TcpTransport {
    /// Create new TCP transport
    pub fn new(addr: impl Into<String>, port: u16) -> Self {
        Self {
            addr: addr.into(),
            port,
            connect_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Resolve address to SocketAddr
    async fn resolve_addr(&self) -> Result<SocketAddr> {
        let addr_str = self.remote_addr();

        let mut addrs = tokio::net::lookup_host(&addr_str)
            .await
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", addr_str, e)))?;

        addrs
            .next()
            .ok_or_else(|| Error::InvalidAddress(format!("No addresses found for {}", addr_str)))
    }

    /// Open a TCP stream to the device
    pub async fn connect_tcp(&self) -> Result<TcpStream> {
        let connect = async {
            let addr = self.resolve_addr().await?;
            debug!("Connecting to {}...", addr);
            TcpStream::connect(addr).await.map_err(Error::Io)
        };

        let stream = if self.connect_timeout.is_zero() {
            connect.await?
        } else {
            timeout(self.connect_timeout, connect)
                .await
                .map_err(|_| Error::ConnectionTimeout)??
        };

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        debug!("Connected to {}", self.remote_addr());

        Ok(stream)
    }
}

#[async_trait]
impl Connector for TcpTransport {
    async fn connect(&self) -> Result<BoxedStream> {
        let stream = self.connect_tcp().await?;
        Ok(Box::new(stream))
    }

    fn remote_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}
