//! Bidirectional relay with half-close handling
//!
//! Both directions are pumped concurrently. When one of them ends, its
//! destination is half-closed and the other direction gets
//! [`RELAY_GRACE_PERIOD`] to finish before it is cut off. Running out of
//! grace is a normal ending, not an error.

use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// How long the second direction may run once the first has finished
pub const RELAY_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Copy buffer size per direction
const RELAY_BUFFER_SIZE: usize = 8 * 1024;

/// Bytes moved by a finished relay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Client to upstream
    pub local_to_remote: u64,
    /// Upstream to client
    pub remote_to_local: u64,
}

/// Relay bytes between the client connection and the upstream
///
/// Returns once both directions are done. The error, if any, is the first
/// one seen in completion order.
///
/// # Arguments
///
/// * `local` - Client side connection
/// * `remote` - Upstream connection, already wrapped in the cipher
pub async fn relay<L, R>(local: L, remote: R) -> io::Result<RelayStats>
where
    L: AsyncRead + AsyncWrite + Unpin,
    R: AsyncRead + AsyncWrite + Unpin,
{
    relay_with_grace(local, remote, RELAY_GRACE_PERIOD).await
}

pub(crate) async fn relay_with_grace<L, R>(
    local: L,
    remote: R,
    grace: Duration,
) -> io::Result<RelayStats>
where
    L: AsyncRead + AsyncWrite + Unpin,
    R: AsyncRead + AsyncWrite + Unpin,
{
    let (mut local_read, mut local_write) = tokio::io::split(local);
    let (mut remote_read, mut remote_write) = tokio::io::split(remote);

    let mut stats = RelayStats::default();

    let (first, second) = {
        let upstream = pipe(&mut local_read, &mut remote_write, &mut stats.local_to_remote);
        let downstream = pipe(&mut remote_read, &mut local_write, &mut stats.remote_to_local);
        tokio::pin!(upstream);
        tokio::pin!(downstream);

        tokio::select! {
            result = &mut upstream => {
                debug!("Client to upstream finished");
                (result, finish_within(grace, downstream).await)
            }
            result = &mut downstream => {
                debug!("Upstream to client finished");
                (result, finish_within(grace, upstream).await)
            }
        }
    };

    first?;
    second?;
    Ok(stats)
}

/// Let the remaining direction run for at most `grace`
async fn finish_within<F>(grace: Duration, direction: F) -> io::Result<()>
where
    F: std::future::Future<Output = io::Result<()>>,
{
    match tokio::time::timeout(grace, direction).await {
        Ok(result) => result,
        Err(_) => {
            debug!("Relay grace period of {:?} elapsed", grace);
            Ok(())
        }
    }
}

/// Copy `reader` into `writer` until EOF or error, then half-close `writer`
async fn pipe<R, W>(reader: &mut R, writer: &mut W, transferred: &mut u64) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let result = copy_chunks(reader, writer, transferred).await;

    if let Err(e) = writer.shutdown().await {
        debug!("Half-close failed: {}", e);
    }

    result
}

async fn copy_chunks<R, W>(reader: &mut R, writer: &mut W, transferred: &mut u64) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; RELAY_BUFFER_SIZE];

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        writer.write_all(&buf[..n]).await?;
        writer.flush().await?;
        *transferred += n as u64;
    }
}
