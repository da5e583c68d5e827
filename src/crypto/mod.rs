//! Cipher factory for the upstream tunnel
//!
//! A [`Cipher`] is picked once from a method name and password, then
//! [`Cipher::wrap`] turns each freshly dialed upstream connection into a
//! [`CipherStream`] that encrypts writes and decrypts reads. Salt exchange
//! happens on first I/O, so wrapping itself never touches the network.
//!
//! Supported methods:
//!
//! | Method                   | Key | Salt |
//! |--------------------------|-----|------|
//! | `aes-128-gcm`            | 16  | 16   |
//! | `aes-256-gcm`            | 32  | 32   |
//! | `chacha20-ietf-poly1305` | 32  | 32   |
//! | `dummy`                  | -   | -    |

mod aead;
mod kdf;
mod stream;

pub use aead::AeadCipher;
pub use kdf::{derive_subkey, evp_bytes_to_key};
pub use stream::CipherStream;

use crate::error::CipherError;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// AEAD tag length for every supported method
pub const TAG_LEN: usize = 16;

/// AEAD nonce length for every supported method
pub const NONCE_LEN: usize = 12;

/// Largest payload carried by one chunk
pub const MAX_PAYLOAD_LEN: usize = 0x3FFF;

/// Encrypted length prefix: u16 plus tag
pub const LENGTH_BLOCK_LEN: usize = 2 + TAG_LEN;

/// Cipher methods understood by [`Cipher::pick`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherKind {
    /// No encryption; the stream is passed through untouched
    Dummy,
    /// AEAD_AES_128_GCM
    Aes128Gcm,
    /// AEAD_AES_256_GCM
    Aes256Gcm,
    /// AEAD_CHACHA20_POLY1305
    ChaCha20IetfPoly1305,
}

impl CipherKind {
    /// Canonical method name
    pub fn name(self) -> &'static str {
        match self {
            CipherKind::Dummy => "dummy",
            CipherKind::Aes128Gcm => "aes-128-gcm",
            CipherKind::Aes256Gcm => "aes-256-gcm",
            CipherKind::ChaCha20IetfPoly1305 => "chacha20-ietf-poly1305",
        }
    }

    /// Master key length in bytes
    pub fn key_len(self) -> usize {
        match self {
            CipherKind::Dummy => 0,
            CipherKind::Aes128Gcm => 16,
            CipherKind::Aes256Gcm | CipherKind::ChaCha20IetfPoly1305 => 32,
        }
    }

    /// Per-session salt length in bytes
    pub fn salt_len(self) -> usize {
        self.key_len()
    }

    /// Whether this method actually encrypts
    pub fn is_aead(self) -> bool {
        !matches!(self, CipherKind::Dummy)
    }

    pub(crate) fn algorithm(self) -> Option<&'static ring::aead::Algorithm> {
        match self {
            CipherKind::Dummy => None,
            CipherKind::Aes128Gcm => Some(&ring::aead::AES_128_GCM),
            CipherKind::Aes256Gcm => Some(&ring::aead::AES_256_GCM),
            CipherKind::ChaCha20IetfPoly1305 => Some(&ring::aead::CHACHA20_POLY1305),
        }
    }
}

impl FromStr for CipherKind {
    type Err = CipherError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_uppercase().as_str() {
            "DUMMY" => Ok(CipherKind::Dummy),
            "AES-128-GCM" | "AEAD_AES_128_GCM" => Ok(CipherKind::Aes128Gcm),
            "AES-256-GCM" | "AEAD_AES_256_GCM" => Ok(CipherKind::Aes256Gcm),
            "CHACHA20-IETF-POLY1305" | "AEAD_CHACHA20_POLY1305" => {
                Ok(CipherKind::ChaCha20IetfPoly1305)
            }
            _ => Err(CipherError::Unsupported(name.to_string())),
        }
    }
}

impl fmt::Display for CipherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A picked cipher method with its master key
///
/// Cheap to clone; the key is shared.
#[derive(Clone, PartialEq, Eq)]
pub struct Cipher {
    kind: CipherKind,
    key: Arc<[u8]>,
}

impl Cipher {
    /// Pick a cipher by name
    ///
    /// When `key` is empty the master key is derived from `password`;
    /// otherwise `key` is used as-is and must match the method's key length.
    pub fn pick(name: &str, key: &[u8], password: &str) -> Result<Self, CipherError> {
        let kind: CipherKind = name.parse()?;

        if !kind.is_aead() {
            return Ok(Cipher {
                kind,
                key: Arc::from(Vec::new()),
            });
        }

        let key = if key.is_empty() {
            if password.is_empty() {
                return Err(CipherError::EmptyPassword(name.to_string()));
            }
            evp_bytes_to_key(password.as_bytes(), kind.key_len())
        } else {
            key.to_vec()
        };

        if key.len() != kind.key_len() {
            return Err(CipherError::KeySize {
                expected: kind.key_len(),
                actual: key.len(),
            });
        }

        Ok(Cipher {
            kind,
            key: Arc::from(key),
        })
    }

    /// The picked method
    pub fn kind(&self) -> CipherKind {
        self.kind
    }

    /// Wrap a plaintext connection
    pub fn wrap<S>(&self, stream: S) -> CipherStream<S> {
        CipherStream::new(stream, self.kind, self.key.clone())
    }
}

impl fmt::Debug for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cipher")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
