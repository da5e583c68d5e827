//! Per-direction AEAD state
//!
//! Each direction of a tunnel owns one [`AeadCipher`]: a session subkey plus
//! a 12-byte little-endian nonce counter that advances after every seal or
//! open.

use super::{kdf, CipherKind, NONCE_LEN};
use crate::error::CipherError;
use bytes::BytesMut;
use ring::aead::{Aad, LessSafeKey, Nonce};

/// AEAD cipher bound to one session salt
pub struct AeadCipher {
    key: LessSafeKey,
    nonce: [u8; NONCE_LEN],
}

impl AeadCipher {
    /// Derive the session cipher for a salt
    ///
    /// # Arguments
    /// * `kind` - Cipher method, must be an AEAD one
    /// * `master_key` - Master key
    /// * `salt` - Session salt
    pub fn new(kind: CipherKind, master_key: &[u8], salt: &[u8]) -> Result<Self, CipherError> {
        let algorithm = kind
            .algorithm()
            .ok_or_else(|| CipherError::Unsupported(kind.name().to_string()))?;
        let unbound = kdf::derive_subkey(algorithm, master_key, salt)?;

        Ok(Self {
            key: LessSafeKey::new(unbound),
            nonce: [0u8; NONCE_LEN],
        })
    }

    /// Encrypt `plaintext` and append ciphertext plus tag to `out`
    pub fn seal_into(&mut self, plaintext: &[u8], out: &mut BytesMut) -> Result<(), CipherError> {
        let start = out.len();
        out.extend_from_slice(plaintext);

        let nonce = Nonce::assume_unique_for_key(self.nonce);
        let tag = self
            .key
            .seal_in_place_separate_tag(nonce, Aad::empty(), &mut out[start..])
            .map_err(|_| CipherError::Aead("seal"))?;
        out.extend_from_slice(tag.as_ref());

        increment(&mut self.nonce);
        Ok(())
    }

    /// Decrypt a ciphertext-plus-tag block in place
    ///
    /// Returns the plaintext prefix of `in_out`.
    pub fn open<'a>(&mut self, in_out: &'a mut [u8]) -> Result<&'a mut [u8], CipherError> {
        let nonce = Nonce::assume_unique_for_key(self.nonce);
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), in_out)
            .map_err(|_| CipherError::Aead("open"))?;

        increment(&mut self.nonce);
        Ok(plaintext)
    }
}

/// Little-endian increment with carry
fn increment(nonce: &mut [u8]) {
    for byte in nonce.iter_mut() {
        *byte = byte.wrapping_add(1);
        if *byte != 0 {
            return;
        }
    }
}
