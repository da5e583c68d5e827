//! # Shadowlocal - Shadowsocks Local Client
//!
//! Shadowlocal listens for SOCKS5 clients on a local address and carries
//! every CONNECT request through a fresh encrypted TCP connection to a
//! remote Shadowsocks relay.
//!
//! ## Features
//!
//! - **SOCKS5 Front End**: No-auth method negotiation, CONNECT, and UDP ASSOCIATE
//!   control connections held open for the lifetime of the association
//! - **AEAD Ciphers**: `aes-128-gcm`, `aes-256-gcm` and `chacha20-ietf-poly1305`
//!   with per-session salts, plus a `dummy` pass-through method
//! - **Half-Close Aware Relay**: One direction finishing gives the other a
//!   short grace period instead of tearing the session down
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shadowlocal::LocalProxy;
//! use std::sync::Arc;
//! use tokio::sync::broadcast;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let proxy = Arc::new(LocalProxy::from_url("ss://aes-256-gcm:secret@relay.example:8388")?);
//!     let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
//!
//!     proxy.listen_and_serve("127.0.0.1:1080", shutdown_rx).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! SOCKS5 Client -> Shadowlocal -> (encrypted) -> Shadowsocks Relay -> Target
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod crypto;
pub mod error;
pub mod helper;
pub mod local;
pub mod socks;
pub mod transport;

// Re-export commonly used items
pub use config::{load_config, Config};
pub use crypto::{Cipher, CipherKind};
pub use error::{CipherError, SessionError, ShadowlocalError, Socks5Error};
pub use local::{run_local, LocalProxy};

/// Version of the Shadowlocal library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "shadowlocal");
    }
}
