//! SOCKS5 handshake with the local client
//!
//! Runs method negotiation and the request sub-dialog on an accepted
//! connection and tells the session what the client asked for. The CONNECT
//! success reply is sent here, before the upstream is dialed, so the
//! client dialog never depends on the remote relay.

use super::auth::authenticate;
use super::command::{build_reply, parse_command, send_command_not_supported, send_reply_for_error};
use super::consts::*;
use super::types::{SocksCommand, TargetAddr};
use crate::config::SocksConfig;
use crate::error::Socks5Error;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

/// What the client requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handshake {
    /// Tunnel a TCP stream to this target
    Connect(TargetAddr),
    /// Hold the control connection open for a UDP association
    UdpAssociate,
}

/// Run the SOCKS5 dialog on `stream`
///
/// `bind_addr` is advertised to UDP ASSOCIATE clients; it should be the
/// local address of the accepted connection.
pub async fn handshake<S>(
    stream: &mut S,
    config: &SocksConfig,
    bind_addr: Option<SocketAddr>,
) -> Result<Handshake, Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let method = authenticate(stream).await?;
    debug!("Authentication completed with method: {:?}", method);

    let (command, target) = match parse_command(stream).await {
        Ok(parsed) => parsed,
        Err(e) => {
            if let Err(reply_err) = send_reply_for_error(stream, &e).await {
                debug!("Failed to send error reply: {}", reply_err);
            }
            return Err(e);
        }
    };

    match command {
        SocksCommand::Connect => {
            build_reply(stream, SOCKS5_REPLY_SUCCEEDED, None).await?;
            Ok(Handshake::Connect(target))
        }
        SocksCommand::UdpAssociate if config.allow_udp => {
            build_reply(stream, SOCKS5_REPLY_SUCCEEDED, bind_addr).await?;
            Ok(Handshake::UdpAssociate)
        }
        SocksCommand::UdpAssociate | SocksCommand::Bind => {
            warn!("{} command not supported", command);
            send_command_not_supported(stream).await?;
            Err(Socks5Error::CommandNotSupported(command.to_byte()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio_test::io::Builder;

    const METHOD_REQUEST: [u8; 3] = [SOCKS5_VERSION, 1, SOCKS5_AUTH_METHOD_NONE];
    const METHOD_REPLY: [u8; 2] = [SOCKS5_VERSION, SOCKS5_AUTH_METHOD_NONE];
    const SUCCESS_REPLY: [u8; 10] = [5, 0, 0, 1, 0, 0, 0, 0, 0, 0];

    fn request(cmd: u8, target: &TargetAddr) -> Vec<u8> {
        let mut data = vec![SOCKS5_VERSION, cmd, SOCKS5_RESERVED];
        data.extend_from_slice(&target.to_bytes());
        data
    }

    fn udp_config(allow_udp: bool) -> SocksConfig {
        SocksConfig { allow_udp }
    }

    #[tokio::test]
    async fn test_handshake_connect() {
        let target = TargetAddr::domain("example.com", 443).unwrap();
        let mut stream = Builder::new()
            .read(&METHOD_REQUEST)
            .write(&METHOD_REPLY)
            .read(&request(SOCKS5_CMD_TCP_CONNECT, &target))
            .write(&SUCCESS_REPLY)
            .build();

        let outcome = handshake(&mut stream, &udp_config(true), None).await.unwrap();
        assert_eq!(outcome, Handshake::Connect(target));
    }

    #[tokio::test]
    async fn test_handshake_udp_associate_replies_with_bind_addr() {
        let bind = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 1080);
        let mut stream = Builder::new()
            .read(&METHOD_REQUEST)
            .write(&METHOD_REPLY)
            .read(&request(SOCKS5_CMD_UDP_ASSOCIATE, &TargetAddr::default()))
            .write(&[5, 0, 0, 1, 127, 0, 0, 1, 0x04, 0x38])
            .build();

        let outcome = handshake(&mut stream, &udp_config(true), Some(bind))
            .await
            .unwrap();
        assert_eq!(outcome, Handshake::UdpAssociate);
    }

    #[tokio::test]
    async fn test_handshake_udp_associate_disabled() {
        let mut stream = Builder::new()
            .read(&METHOD_REQUEST)
            .write(&METHOD_REPLY)
            .read(&request(SOCKS5_CMD_UDP_ASSOCIATE, &TargetAddr::default()))
            .write(&[5, SOCKS5_REPLY_COMMAND_NOT_SUPPORTED, 0, 1, 0, 0, 0, 0, 0, 0])
            .build();

        let result = handshake(&mut stream, &udp_config(false), None).await;
        assert!(matches!(
            result,
            Err(Socks5Error::CommandNotSupported(SOCKS5_CMD_UDP_ASSOCIATE))
        ));
    }

    #[tokio::test]
    async fn test_handshake_bind_refused() {
        let target = TargetAddr::ipv4(Ipv4Addr::new(10, 0, 0, 1), 21);
        let mut stream = Builder::new()
            .read(&METHOD_REQUEST)
            .write(&METHOD_REPLY)
            .read(&request(SOCKS5_CMD_TCP_BIND, &target))
            .write(&[5, SOCKS5_REPLY_COMMAND_NOT_SUPPORTED, 0, 1, 0, 0, 0, 0, 0, 0])
            .build();

        let result = handshake(&mut stream, &udp_config(true), None).await;
        assert!(matches!(result, Err(Socks5Error::CommandNotSupported(2))));
    }

    #[tokio::test]
    async fn test_handshake_bad_address_type() {
        let mut stream = Builder::new()
            .read(&METHOD_REQUEST)
            .write(&METHOD_REPLY)
            .read(&[SOCKS5_VERSION, SOCKS5_CMD_TCP_CONNECT, SOCKS5_RESERVED, 0x05])
            .write(&[5, SOCKS5_REPLY_ADDRESS_TYPE_NOT_SUPPORTED, 0, 1, 0, 0, 0, 0, 0, 0])
            .build();

        let result = handshake(&mut stream, &udp_config(true), None).await;
        assert!(matches!(result, Err(Socks5Error::AddressTypeNotSupported(5))));
    }
}
