//! Local proxy module for Shadowlocal
//!
//! This module contains the SOCKS5 listener, the per-connection session and
//! the relay engine. A [`LocalProxy`] is built once from the server URL and
//! shared by every session.

mod relay;
mod session;

pub use relay::{relay, RelayStats, RELAY_GRACE_PERIOD};
pub use session::{run_session, SessionOutcome};

use crate::config::{Config, LocalConfig, ServerUrl, SocksConfig};
use crate::crypto::Cipher;
use crate::error::ShadowlocalError;
use crate::helper::{timeout_from_secs, RetryConfig};
use crate::transport::{AddrMaybeCached, TcpTransport, Transport};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Shadowsocks local proxy
///
/// Immutable once built; the relay endpoint and cipher never change.
#[derive(Debug)]
pub struct LocalProxy<T: Transport = TcpTransport> {
    /// Remote relay endpoint
    remote: AddrMaybeCached,
    /// Cipher applied to every upstream connection
    cipher: Cipher,
    /// Dialer for the remote relay
    transport: T,
    /// SOCKS5 options
    socks: SocksConfig,
    /// Limit on the SOCKS5 dialog
    handshake_timeout: Option<Duration>,
}

impl LocalProxy<TcpTransport> {
    /// Build a proxy from a server URL with default settings
    ///
    /// No network I/O happens here.
    ///
    /// # Arguments
    ///
    /// * `server` - URL such as `ss://aes-256-gcm:secret@relay.example:8388`
    pub fn from_url(server: &str) -> Result<Self, ShadowlocalError> {
        Self::from_config(&LocalConfig::new(server, String::new()))
    }

    /// Build a proxy from the local configuration section
    pub fn from_config(config: &LocalConfig) -> Result<Self, ShadowlocalError> {
        let server = ServerUrl::parse(&config.server)?;
        let cipher = Cipher::pick(&server.method, &[], &server.password)?;

        Ok(LocalProxy {
            remote: AddrMaybeCached::new(&server.remote),
            cipher,
            transport: TcpTransport::from_config(config),
            socks: config.socks.clone(),
            handshake_timeout: timeout_from_secs(config.handshake_timeout),
        })
    }
}

impl<T: Transport> LocalProxy<T> {
    /// Swap the dialer used for the remote relay
    pub fn with_transport<U: Transport>(self, transport: U) -> LocalProxy<U> {
        LocalProxy {
            remote: self.remote,
            cipher: self.cipher,
            transport,
            socks: self.socks,
            handshake_timeout: self.handshake_timeout,
        }
    }

    /// Remote relay endpoint as `host:port`
    pub fn remote(&self) -> &str {
        self.remote.addr()
    }

    /// Cipher applied to upstream connections
    pub fn cipher(&self) -> &Cipher {
        &self.cipher
    }

    /// Bind `addr` and serve SOCKS5 clients until shutdown
    ///
    /// # Arguments
    ///
    /// * `addr` - Listen address, `host:port`
    /// * `shutdown_rx` - Stops accepting when a value arrives
    pub async fn listen_and_serve(
        self: Arc<Self>,
        addr: &str,
        shutdown_rx: broadcast::Receiver<bool>,
    ) -> Result<(), ShadowlocalError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ShadowlocalError::Listen {
                addr: addr.to_string(),
                source,
            })?;

        self.serve(listener, shutdown_rx).await
    }

    /// Serve SOCKS5 clients on an already bound listener until shutdown
    ///
    /// Sessions already running are left alone when shutdown arrives.
    pub async fn serve(
        self: Arc<Self>,
        listener: TcpListener,
        mut shutdown_rx: broadcast::Receiver<bool>,
    ) -> Result<(), ShadowlocalError> {
        let local_addr = listener.local_addr()?;
        info!("SOCKS proxy {} <-> {}", local_addr, self.remote());

        let backoff = RetryConfig::for_accept();
        let mut failures: u32 = 0;

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            failures = 0;
                            debug!("Accepted connection from {}", peer);

                            let bind_addr = stream.local_addr().ok();
                            let proxy = self.clone();
                            tokio::spawn(async move {
                                session::handle_session(&proxy, stream, peer, bind_addr).await;
                            });
                        }
                        Err(e) => {
                            let delay = backoff.delay_for_attempt(failures);
                            failures = failures.saturating_add(1);
                            warn!("Failed to accept: {}, retrying in {:?}", e, delay);
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, closing listener on {}", local_addr);
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Run the local proxy described by `config` until shutdown
pub async fn run_local(
    config: Config,
    shutdown_rx: broadcast::Receiver<bool>,
) -> anyhow::Result<()> {
    let proxy = Arc::new(LocalProxy::from_config(&config.local)?);
    proxy
        .listen_and_serve(&config.local.listen, shutdown_rx)
        .await?;

    info!("Local proxy stopped");
    Ok(())
}
