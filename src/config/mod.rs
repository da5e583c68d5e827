//! Configuration module for Shadowlocal
//!
//! This module provides configuration types, TOML loading and server URL
//! parsing for the local proxy.

mod local;
mod server_url;
mod transport;

pub use local::{Config, LocalConfig, SocksConfig};
pub use server_url::ServerUrl;
pub use transport::TcpConfig;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

    parse_config(&content)
}

/// Parse configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_config() {
        let config_str = r#"
[local]
server = "ss://aes-256-gcm:secret@relay.example:8388"
"#;

        let config = parse_config(config_str).unwrap();
        assert_eq!(config.local.server, "ss://aes-256-gcm:secret@relay.example:8388");
        assert_eq!(config.local.listen, "127.0.0.1:1080");
        assert_eq!(config.local.connect_timeout, 10);
        assert!(config.local.socks.allow_udp);
    }

    #[test]
    fn test_parse_full_config() {
        let config_str = r#"
[local]
server = "ss://chacha20-ietf-poly1305:pw@10.0.0.1:443"
listen = "0.0.0.0:1081"
connect_timeout = 5
handshake_timeout = 30

[local.socks]
allow_udp = false

[local.tcp]
nodelay = false
keepalive_secs = 30
keepalive_interval = 10
"#;

        let config = parse_config(config_str).unwrap();
        assert_eq!(config.local.listen, "0.0.0.0:1081");
        assert_eq!(config.local.connect_timeout, 5);
        assert_eq!(config.local.handshake_timeout, 30);
        assert!(!config.local.socks.allow_udp);
        assert!(!config.local.tcp.nodelay);
        assert_eq!(config.local.tcp.keepalive_secs, 30);
    }

    #[test]
    fn test_parse_config_missing_server() {
        let result = parse_config("[local]\nlisten = \"127.0.0.1:1080\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[local]").unwrap();
        writeln!(file, "server = \"ss://dummy:x@127.0.0.1:8388\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.local.server, "ss://dummy:x@127.0.0.1:8388");
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("/nonexistent/shadowlocal.toml");
        assert!(result.is_err());
    }
}
