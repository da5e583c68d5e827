//! Error types for Shadowlocal
//!
//! This module defines the error types shared across the proxy. Session
//! errors stay inside the session task; only configuration and listen
//! errors reach the caller of [`LocalProxy`](crate::local::LocalProxy).

use std::io;
use thiserror::Error;

/// Main error type for Shadowlocal operations
#[derive(Error, Debug)]
pub enum ShadowlocalError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to bind the local listener
    #[error("Failed to listen on {addr}: {source}")]
    Listen {
        /// Address we tried to bind
        addr: String,
        /// Underlying bind error
        #[source]
        source: io::Error,
    },

    /// Cipher construction error
    #[error("Cipher error: {0}")]
    Cipher(#[from] CipherError),

    /// SOCKS5 protocol error
    #[error("SOCKS5 error: {0}")]
    Socks5(#[from] Socks5Error),
}

/// Errors produced while picking a cipher
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// The method name is not known
    #[error("cipher not supported: {0}")]
    Unsupported(String),

    /// AEAD methods need a password when no raw key is supplied
    #[error("password required for cipher {0}")]
    EmptyPassword(String),

    /// A raw key was supplied with the wrong length
    #[error("key size error: need {expected} bytes, got {actual}")]
    KeySize {
        /// Required key length
        expected: usize,
        /// Supplied key length
        actual: usize,
    },

    /// The underlying AEAD implementation rejected the key
    #[error("invalid key material")]
    InvalidKey,

    /// Sealing or opening a chunk failed
    #[error("AEAD {0} failed")]
    Aead(&'static str),
}

impl From<CipherError> for io::Error {
    fn from(err: CipherError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, err)
    }
}

/// SOCKS5 specific errors
#[derive(Error, Debug)]
pub enum Socks5Error {
    /// IO error while talking to the client
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Unsupported SOCKS version
    #[error("Unsupported SOCKS version: {0}")]
    UnsupportedVersion(u8),

    /// Client offered an empty method list
    #[error("No authentication methods provided")]
    NoMethods,

    /// No acceptable authentication method
    #[error("No acceptable authentication method")]
    NoAcceptableMethod,

    /// Command not supported
    #[error("Command not supported: {0}")]
    CommandNotSupported(u8),

    /// Address type not supported
    #[error("Address type not supported: {0}")]
    AddressTypeNotSupported(u8),

    /// Invalid domain name
    #[error("Invalid domain name: {0}")]
    InvalidDomain(String),
}

/// Session-scoped failures
///
/// None of these propagate past the session task; they are logged with the
/// client and upstream addresses and the session is torn down.
#[derive(Error, Debug)]
pub enum SessionError {
    /// SOCKS5 dialog with the local client failed
    #[error("failed to get target address: {0}")]
    Handshake(#[from] Socks5Error),

    /// Could not reach the remote relay
    #[error("failed to connect to server {remote}: {source}")]
    Dial {
        /// Remote relay endpoint
        remote: String,
        /// Requested target
        target: String,
        /// Underlying dial error
        #[source]
        source: io::Error,
    },

    /// Could not emit the target header on the encrypted upstream
    #[error("failed to send target address: {source}")]
    HeaderWrite {
        /// Requested target
        target: String,
        /// Underlying write error
        #[source]
        source: io::Error,
    },

    /// Non-deadline IO error while relaying
    #[error("relay error: {source}")]
    Relay {
        /// Requested target
        target: String,
        /// Underlying relay error
        #[source]
        source: io::Error,
    },

    /// A configured handshake or dial timeout elapsed
    #[error("timed out during {0}")]
    Timeout(&'static str),
}

impl SessionError {
    /// Target the client asked for, once the handshake got that far
    pub fn target(&self) -> Option<&str> {
        match self {
            SessionError::Dial { target, .. }
            | SessionError::HeaderWrite { target, .. }
            | SessionError::Relay { target, .. } => Some(target.as_str()),
            SessionError::Handshake(_) | SessionError::Timeout(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadowlocal_error_display() {
        let err = ShadowlocalError::Config("invalid config".to_string());
        assert_eq!(format!("{}", err), "Configuration error: invalid config");

        let err = ShadowlocalError::Listen {
            addr: "127.0.0.1:1080".to_string(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        };
        assert_eq!(format!("{}", err), "Failed to listen on 127.0.0.1:1080: in use");
    }

    #[test]
    fn test_shadowlocal_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::Other, "io error");
        let err: ShadowlocalError = io_err.into();
        assert!(matches!(err, ShadowlocalError::Io(_)));
    }

    #[test]
    fn test_shadowlocal_error_from_cipher() {
        let err: ShadowlocalError = CipherError::Unsupported("rc4".to_string()).into();
        assert!(matches!(err, ShadowlocalError::Cipher(_)));
        assert_eq!(format!("{}", err), "Cipher error: cipher not supported: rc4");
    }

    #[test]
    fn test_cipher_error_display() {
        let err = CipherError::KeySize {
            expected: 32,
            actual: 7,
        };
        assert_eq!(format!("{}", err), "key size error: need 32 bytes, got 7");

        let err = CipherError::EmptyPassword("AES-256-GCM".to_string());
        assert_eq!(format!("{}", err), "password required for cipher AES-256-GCM");
    }

    #[test]
    fn test_socks5_error_display() {
        let err = Socks5Error::UnsupportedVersion(4);
        assert_eq!(format!("{}", err), "Unsupported SOCKS version: 4");

        let err = Socks5Error::NoAcceptableMethod;
        assert_eq!(format!("{}", err), "No acceptable authentication method");

        let err = Socks5Error::CommandNotSupported(0xFF);
        assert_eq!(format!("{}", err), "Command not supported: 255");

        let err = Socks5Error::AddressTypeNotSupported(0x99);
        assert_eq!(format!("{}", err), "Address type not supported: 153");

        let err = Socks5Error::InvalidDomain("bad.domain".to_string());
        assert_eq!(format!("{}", err), "Invalid domain name: bad.domain");
    }

    #[test]
    fn test_session_error_display() {
        let err = SessionError::Dial {
            remote: "127.0.0.1:8388".to_string(),
            target: "example.com:443".to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert_eq!(
            format!("{}", err),
            "failed to connect to server 127.0.0.1:8388: refused"
        );
        assert_eq!(err.target(), Some("example.com:443"));

        let err = SessionError::Timeout("handshake");
        assert_eq!(format!("{}", err), "timed out during handshake");
    }

    #[test]
    fn test_session_error_from_socks5() {
        let err: SessionError = Socks5Error::NoMethods.into();
        assert!(matches!(err, SessionError::Handshake(_)));
        assert_eq!(err.target(), None);
    }
}
