//! TCP transport implementation
//!
//! Plain TCP connections to the remote relay with an optional connect
//! timeout and socket options applied after connect. Every resolved
//! address is tried in order until one connects.

use super::{AddrMaybeCached, SocketOpts, Transport};
use crate::config::LocalConfig;
use crate::helper::{timeout_from_secs, DEFAULT_CONNECT_TIMEOUT_SECS};
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;

/// TCP transport for upstream connections
#[derive(Debug, Clone)]
pub struct TcpTransport {
    /// Socket options to apply to connections
    socket_opts: SocketOpts,
    /// Connection timeout, `None` waits for the OS
    connect_timeout: Option<Duration>,
}

impl Default for TcpTransport {
    fn default() -> Self {
        TcpTransport {
            socket_opts: SocketOpts::default(),
            connect_timeout: Some(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)),
        }
    }
}

impl TcpTransport {
    /// Build a transport from the local proxy configuration
    pub fn from_config(config: &LocalConfig) -> Self {
        TcpTransport {
            socket_opts: SocketOpts::from_tcp_config(&config.tcp),
            connect_timeout: timeout_from_secs(config.connect_timeout),
        }
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    async fn connect_one(&self, addr: SocketAddr) -> io::Result<TcpStream> {
        let connecting = TcpStream::connect(addr);
        match self.connect_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, connecting).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connect to {} timed out after {:?}", addr, timeout),
                )),
            },
            None => connecting.await,
        }
    }

    /// Dial `candidates` in order and return the first connection
    ///
    /// The error of the last attempt is returned when none connects.
    async fn connect_first(
        &self,
        candidates: &[SocketAddr],
    ) -> io::Result<(TcpStream, SocketAddr)> {
        let mut last_err = None;

        for &candidate in candidates {
            match self.connect_one(candidate).await {
                Ok(stream) => return Ok((stream, candidate)),
                Err(e) => {
                    tracing::debug!("Failed to connect to {}: {}", candidate, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "no addresses to connect to")
        }))
    }
}

#[async_trait]
impl Transport for TcpTransport {
    type Stream = TcpStream;

    async fn connect(&self, addr: &AddrMaybeCached) -> io::Result<Self::Stream> {
        let candidates = addr.resolve().await?;

        let (stream, connected) = match self.connect_first(&candidates).await {
            Ok(found) => found,
            Err(e) => {
                // The relay may have moved; resolve again next time
                addr.clear_cache().await;
                return Err(e);
            }
        };
        addr.remember(connected).await;

        if let Err(e) = self.socket_opts.apply(&stream) {
            tracing::warn!("Failed to apply socket options: {}", e);
        }

        tracing::debug!("TCP connection established to {}", connected);

        Ok(stream)
    }
}
