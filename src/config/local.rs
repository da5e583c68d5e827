//! Local proxy configuration types
//!
//! Defines the configuration structures read from the TOML file or built
//! from command-line flags.

use super::TcpConfig;
use crate::helper::DEFAULT_CONNECT_TIMEOUT_SECS;
use serde::{Deserialize, Serialize};

/// Default SOCKS5 listen address
fn default_listen() -> String {
    "127.0.0.1:1080".to_string()
}

/// Default upstream connect timeout in seconds
fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Local proxy configuration
    pub local: LocalConfig,
}

/// Local proxy configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LocalConfig {
    /// Remote relay URL (e.g., "ss://aes-256-gcm:secret@relay.example:8388")
    pub server: String,

    /// Address the SOCKS5 listener binds
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Upstream connect timeout in seconds (0 disables)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// SOCKS5 handshake timeout in seconds (0 disables)
    #[serde(default)]
    pub handshake_timeout: u64,

    /// SOCKS5 server configuration
    #[serde(default)]
    pub socks: SocksConfig,

    /// Upstream TCP socket options
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl LocalConfig {
    /// Build a configuration with defaults for everything but the endpoints
    pub fn new(server: impl Into<String>, listen: impl Into<String>) -> Self {
        LocalConfig {
            server: server.into(),
            listen: listen.into(),
            connect_timeout: default_connect_timeout(),
            handshake_timeout: 0,
            socks: SocksConfig::default(),
            tcp: TcpConfig::default(),
        }
    }
}

fn default_allow_udp() -> bool {
    true
}

/// SOCKS5 server configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SocksConfig {
    /// Accept UDP ASSOCIATE and hold the control connection open
    #[serde(default = "default_allow_udp")]
    pub allow_udp: bool,
}

impl Default for SocksConfig {
    fn default() -> Self {
        Self {
            allow_udp: default_allow_udp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socks_config_default() {
        let config = SocksConfig::default();
        assert!(config.allow_udp);
    }

    #[test]
    fn test_local_config_new() {
        let config = LocalConfig::new("ss://dummy:x@127.0.0.1:8388", "127.0.0.1:0");
        assert_eq!(config.server, "ss://dummy:x@127.0.0.1:8388");
        assert_eq!(config.listen, "127.0.0.1:0");
        assert_eq!(config.connect_timeout, 10);
        assert_eq!(config.handshake_timeout, 0);
        assert!(config.tcp.nodelay);
    }

    #[test]
    fn test_default_listen() {
        assert_eq!(default_listen(), "127.0.0.1:1080");
    }
}
