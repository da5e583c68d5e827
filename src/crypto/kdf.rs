//! Key derivation
//!
//! Master keys come from the password via OpenSSL's EVP_BytesToKey (MD5,
//! one iteration, no salt). Per-session subkeys come from the master key
//! and the session salt via HKDF-SHA1 with the info string `ss-subkey`.

use crate::error::CipherError;
use md5::{Digest, Md5};
use ring::aead::{self, UnboundKey};
use ring::hkdf::{self, Salt, HKDF_SHA1_FOR_LEGACY_USE_ONLY};

/// HKDF info string for session subkeys
const SUBKEY_INFO: &[u8] = b"ss-subkey";

/// Derive a master key from a password
///
/// # Arguments
/// * `password` - Password bytes
/// * `key_len` - Length of the key to produce
pub fn evp_bytes_to_key(password: &[u8], key_len: usize) -> Vec<u8> {
    let mut key = Vec::with_capacity(key_len + 16);
    let mut prev: Vec<u8> = Vec::new();

    while key.len() < key_len {
        let mut hasher = Md5::new();
        hasher.update(&prev);
        hasher.update(password);
        prev = hasher.finalize().to_vec();
        key.extend_from_slice(&prev);
    }

    key.truncate(key_len);
    key
}

/// Derive the session key for one direction of a connection
///
/// # Arguments
/// * `algorithm` - AEAD algorithm the key is for
/// * `master_key` - Master key picked at startup
/// * `salt` - Salt sent (or received) at the start of the stream
pub fn derive_subkey(
    algorithm: &'static aead::Algorithm,
    master_key: &[u8],
    salt: &[u8],
) -> Result<UnboundKey, CipherError> {
    let subkey = hkdf_sha1(master_key, salt, SUBKEY_INFO, algorithm.key_len())?;
    UnboundKey::new(algorithm, &subkey).map_err(|_| CipherError::InvalidKey)
}

/// Raw HKDF-SHA1 into a fresh buffer
///
/// # Arguments
/// * `ikm` - Input keying material
/// * `salt` - HKDF salt
/// * `info` - Context information
/// * `len` - Output length
pub(crate) fn hkdf_sha1(ikm: &[u8], salt: &[u8], info: &[u8], len: usize) -> Result<Vec<u8>, CipherError> {
    let prk = Salt::new(HKDF_SHA1_FOR_LEGACY_USE_ONLY, salt).extract(ikm);
    let info_refs = [info];
    let okm = prk
        .expand(&info_refs, HkdfLen(len))
        .map_err(|_| CipherError::InvalidKey)?;

    let mut out = vec![0u8; len];
    okm.fill(&mut out).map_err(|_| CipherError::InvalidKey)?;
    Ok(out)
}

/// Output length for raw HKDF expansion
struct HkdfLen(usize);

impl hkdf::KeyType for HkdfLen {
    fn len(&self) -> usize {
        self.0
    }
}
