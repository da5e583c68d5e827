//! Per-connection session
//!
//! One session owns an accepted client connection from the SOCKS5 dialog
//! until both sides of the relay are done. Both connections are dropped,
//! and thereby closed, when the session returns.

use super::relay::{relay, RelayStats};
use super::LocalProxy;
use crate::error::SessionError;
use crate::socks::{handshake, Handshake};
use crate::transport::Transport;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// How a session ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The TCP relay ran to completion
    Relayed(RelayStats),
    /// The client released its UDP association
    UdpReleased,
}

/// Serve one accepted client and log how it ended
pub(crate) async fn handle_session<T, S>(
    proxy: &LocalProxy<T>,
    client: S,
    peer: SocketAddr,
    bind_addr: Option<SocketAddr>,
) where
    T: Transport,
    S: AsyncRead + AsyncWrite + Unpin,
{
    match run_session(proxy, client, peer, bind_addr).await {
        Ok(SessionOutcome::Relayed(stats)) => {
            debug!(
                client = %peer,
                sent = stats.local_to_remote,
                received = stats.remote_to_local,
                "Session finished"
            );
        }
        Ok(SessionOutcome::UdpReleased) => {
            info!(client = %peer, "UDP association released");
        }
        Err(e) => match e.target() {
            Some(target) => {
                warn!(client = %peer, remote = %proxy.remote(), target = %target, "{}", e);
            }
            None => {
                warn!(client = %peer, remote = %proxy.remote(), "{}", e);
            }
        },
    }
}

/// Run a session to completion
///
/// # Arguments
///
/// * `proxy` - Shared proxy settings
/// * `client` - Accepted client connection, consumed
/// * `peer` - Client address, for logging
/// * `bind_addr` - Address advertised to UDP ASSOCIATE clients
pub async fn run_session<T, S>(
    proxy: &LocalProxy<T>,
    mut client: S,
    peer: SocketAddr,
    bind_addr: Option<SocketAddr>,
) -> Result<SessionOutcome, SessionError>
where
    T: Transport,
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = handshake(&mut client, &proxy.socks, bind_addr);
    let outcome = match proxy.handshake_timeout {
        Some(limit) => tokio::time::timeout(limit, request)
            .await
            .map_err(|_| SessionError::Timeout("handshake"))??,
        None => request.await?,
    };

    let target = match outcome {
        Handshake::Connect(target) => target,
        Handshake::UdpAssociate => {
            debug!(client = %peer, "Holding UDP association");
            hold_udp_association(&mut client).await;
            return Ok(SessionOutcome::UdpReleased);
        }
    };

    let upstream = proxy
        .transport
        .connect(&proxy.remote)
        .await
        .map_err(|source| SessionError::Dial {
            remote: proxy.remote().to_string(),
            target: target.to_string(),
            source,
        })?;

    let mut upstream = proxy.cipher.wrap(upstream);
    let header = target.to_bytes();
    let written = async {
        upstream.write_all(&header).await?;
        upstream.flush().await
    };
    written.await.map_err(|source| SessionError::HeaderWrite {
        target: target.to_string(),
        source,
    })?;

    info!("proxy {} <-> {} <-> {}", peer, proxy.remote(), target);

    let stats = relay(client, upstream)
        .await
        .map_err(|source| SessionError::Relay {
            target: target.to_string(),
            source,
        })?;
    Ok(SessionOutcome::Relayed(stats))
}

/// Keep the control connection of a UDP association open until the client
/// lets go of it. Anything the client sends is discarded.
async fn hold_udp_association<S>(client: &mut S)
where
    S: AsyncRead + Unpin,
{
    let mut buf = [0u8; 512];

    loop {
        match client.read(&mut buf).await {
            Ok(0) => {
                debug!("UDP control connection closed");
                break;
            }
            Ok(n) => {
                debug!("Discarded {} bytes on UDP control connection", n);
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                continue;
            }
            Err(e) => {
                debug!("UDP control connection error: {}", e);
                break;
            }
        }
    }
}
