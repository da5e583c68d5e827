//! Test utilities for Shadowlocal
//!
//! Listener helpers, SOCKS5 request builders and a fake Shadowsocks relay
//! that decrypts the tunnel and hands each session to a test handler.

#![allow(dead_code)]

use shadowlocal::crypto::{Cipher, CipherStream};
use shadowlocal::socks::TargetAddr;
use shadowlocal::LocalProxy;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};

/// Create a test TCP listener on an available port
pub async fn create_test_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// An address nothing listens on
pub async fn closed_port_addr() -> SocketAddr {
    let (listener, addr) = create_test_listener().await;
    drop(listener);
    addr
}

/// A running local proxy
pub struct RunningProxy {
    /// SOCKS5 listen address
    pub addr: SocketAddr,
    /// Fires the listener shutdown
    pub shutdown_tx: broadcast::Sender<bool>,
}

/// Start a local proxy for `server_url` on an ephemeral port
pub async fn spawn_proxy(server_url: &str) -> RunningProxy {
    let proxy = Arc::new(LocalProxy::from_url(server_url).unwrap());
    let (listener, addr) = create_test_listener().await;
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    tokio::spawn(proxy.serve(listener, shutdown_rx));

    RunningProxy { addr, shutdown_tx }
}

/// Fake Shadowsocks relay
pub struct FakeRelay {
    /// Address the relay listens on
    pub addr: SocketAddr,
    /// Target headers decoded from each tunnel, in accept order
    pub targets: mpsc::UnboundedReceiver<TargetAddr>,
    /// Number of accepted tunnels
    pub accepted: Arc<AtomicUsize>,
}

impl FakeRelay {
    /// Tunnels accepted so far
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

/// Start a fake relay that decrypts with `cipher` and runs `handler` for
/// every tunnel after its target header has been read
pub async fn spawn_fake_relay<F, Fut>(cipher: Cipher, handler: F) -> FakeRelay
where
    F: Fn(CipherStream<TcpStream>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (listener, addr) = create_test_listener().await;
    let (targets_tx, targets) = mpsc::unbounded_channel();
    let accepted = Arc::new(AtomicUsize::new(0));
    let handler = Arc::new(handler);

    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let targets_tx = targets_tx.clone();
            let handler = handler.clone();
            let cipher = cipher.clone();

            tokio::spawn(async move {
                let mut tunnel = cipher.wrap(stream);
                let target = match TargetAddr::read_from(&mut tunnel).await {
                    Ok(target) => target,
                    Err(_) => return,
                };
                let _ = targets_tx.send(target);
                (*handler)(tunnel).await;
            });
        }
    });

    FakeRelay {
        addr,
        targets,
        accepted,
    }
}

/// Relay handler that echoes everything back, then closes
pub async fn echo(mut tunnel: CipherStream<TcpStream>) {
    let mut buf = [0u8; 4096];
    loop {
        match tunnel.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if tunnel.write_all(&buf[..n]).await.is_err() || tunnel.flush().await.is_err() {
                    return;
                }
            }
        }
    }
    let _ = tunnel.shutdown().await;
}

/// Build a server URL for a relay address
pub fn server_url(method: &str, password: &str, relay: SocketAddr) -> String {
    format!("ss://{}:{}@{}", method, password, relay)
}

/// Mock SOCKS5 handshake data
pub mod socks5_mock {
    use shadowlocal::socks::*;

    /// Create a no-auth method selection request
    pub fn create_auth_request_no_auth() -> Vec<u8> {
        vec![SOCKS5_VERSION, 1, SOCKS5_AUTH_METHOD_NONE]
    }

    /// Create a password-only method selection request
    pub fn create_auth_request_password() -> Vec<u8> {
        vec![SOCKS5_VERSION, 1, SOCKS5_AUTH_METHOD_PASSWORD]
    }

    /// Create a connect command to IPv4 address
    pub fn create_connect_ipv4(ip: [u8; 4], port: u16) -> Vec<u8> {
        let mut cmd = vec![
            SOCKS5_VERSION,
            SOCKS5_CMD_TCP_CONNECT,
            SOCKS5_RESERVED,
            SOCKS5_ADDR_TYPE_IPV4,
        ];
        cmd.extend_from_slice(&ip);
        cmd.extend_from_slice(&port.to_be_bytes());
        cmd
    }

    /// Create a connect command to domain
    pub fn create_connect_domain(domain: &str, port: u16) -> Vec<u8> {
        let mut cmd = vec![
            SOCKS5_VERSION,
            SOCKS5_CMD_TCP_CONNECT,
            SOCKS5_RESERVED,
            SOCKS5_ADDR_TYPE_DOMAIN,
            domain.len() as u8,
        ];
        cmd.extend_from_slice(domain.as_bytes());
        cmd.extend_from_slice(&port.to_be_bytes());
        cmd
    }

    /// Create a UDP ASSOCIATE command with an all-zero client address
    pub fn create_udp_associate() -> Vec<u8> {
        vec![
            SOCKS5_VERSION,
            SOCKS5_CMD_UDP_ASSOCIATE,
            SOCKS5_RESERVED,
            SOCKS5_ADDR_TYPE_IPV4,
            0,
            0,
            0,
            0,
            0,
            0,
        ]
    }

    /// Create a BIND command
    pub fn create_bind_ipv4(ip: [u8; 4], port: u16) -> Vec<u8> {
        let mut cmd = create_connect_ipv4(ip, port);
        cmd[1] = SOCKS5_CMD_TCP_BIND;
        cmd
    }
}

/// Run the SOCKS5 greeting and `request` against the proxy
///
/// Returns the connected stream and the 10-byte reply.
pub async fn socks5_request(proxy: SocketAddr, request: &[u8]) -> (TcpStream, [u8; 10]) {
    let mut stream = TcpStream::connect(proxy).await.unwrap();

    stream
        .write_all(&socks5_mock::create_auth_request_no_auth())
        .await
        .unwrap();
    let mut method = [0u8; 2];
    stream.read_exact(&mut method).await.unwrap();
    assert_eq!(method, [0x05, 0x00]);

    stream.write_all(request).await.unwrap();
    let mut reply = [0u8; 10];
    stream.read_exact(&mut reply).await.unwrap();

    (stream, reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_test_listener() {
        let (listener, addr) = create_test_listener().await;
        assert!(addr.port() > 0);
        drop(listener);
    }

    #[test]
    fn test_server_url() {
        let addr: SocketAddr = "127.0.0.1:8388".parse().unwrap();
        assert_eq!(
            server_url("aes-256-gcm", "pw", addr),
            "ss://aes-256-gcm:pw@127.0.0.1:8388"
        );
    }

    #[test]
    fn test_socks5_mock_requests() {
        let ipv4 = socks5_mock::create_connect_ipv4([93, 184, 216, 34], 80);
        assert_eq!(&ipv4[3..], &[0x01u8, 0x5D, 0xB8, 0xD8, 0x22, 0x00, 0x50]);

        let bind = socks5_mock::create_bind_ipv4([1, 2, 3, 4], 5);
        assert_eq!(bind[1], 0x02);
    }
}
