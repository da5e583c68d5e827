//! Encrypted stream adapter
//!
//! Wire format per direction: `[salt][len block][payload block]...` where
//! the length block is the sealed big-endian u16 payload length and the
//! payload block is the sealed payload, each followed by a 16-byte tag.
//! The dummy method passes bytes through untouched.

use super::{AeadCipher, CipherKind, LENGTH_BLOCK_LEN, MAX_PAYLOAD_LEN, TAG_LEN};
use bytes::{Buf, BytesMut};
use ring::rand::{SecureRandom, SystemRandom};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Read size used when pulling ciphertext from the inner stream
const READ_CHUNK: usize = 16 * 1024;

/// A connection wrapped in a cipher
///
/// Writes are buffered as sealed chunks; callers must flush after writing
/// a message they expect the peer to see.
pub struct CipherStream<S> {
    inner: S,
    encryptor: Option<Encryptor>,
    decryptor: Option<Decryptor>,
}

impl<S> CipherStream<S> {
    pub(crate) fn new(inner: S, kind: CipherKind, key: Arc<[u8]>) -> Self {
        if !kind.is_aead() {
            return Self {
                inner,
                encryptor: None,
                decryptor: None,
            };
        }

        Self {
            inner,
            encryptor: Some(Encryptor::new(kind, key.clone())),
            decryptor: Some(Decryptor::new(kind, key)),
        }
    }
}

struct Encryptor {
    kind: CipherKind,
    key: Arc<[u8]>,
    cipher: Option<AeadCipher>,
    pending: BytesMut,
}

impl Encryptor {
    fn new(kind: CipherKind, key: Arc<[u8]>) -> Self {
        Self {
            kind,
            key,
            cipher: None,
            pending: BytesMut::new(),
        }
    }

    /// Seal one chunk into the pending buffer, emitting the salt first
    fn seal_chunk(&mut self, payload: &[u8]) -> io::Result<()> {
        if self.cipher.is_none() {
            let mut salt = vec![0u8; self.kind.salt_len()];
            SystemRandom::new()
                .fill(&mut salt)
                .map_err(|_| io::Error::new(io::ErrorKind::Other, "failed to generate salt"))?;
            self.pending.extend_from_slice(&salt);
            self.cipher = Some(AeadCipher::new(self.kind, &self.key, &salt)?);
        }

        if let Some(cipher) = self.cipher.as_mut() {
            self.pending.reserve(LENGTH_BLOCK_LEN + payload.len() + TAG_LEN);
            cipher.seal_into(&(payload.len() as u16).to_be_bytes(), &mut self.pending)?;
            cipher.seal_into(payload, &mut self.pending)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadStage {
    Salt,
    Length,
    Payload(usize),
}

struct Decryptor {
    kind: CipherKind,
    key: Arc<[u8]>,
    cipher: Option<AeadCipher>,
    stage: ReadStage,
    incoming: BytesMut,
    plaintext: BytesMut,
    scratch: Box<[u8]>,
    eof: bool,
}

impl Decryptor {
    fn new(kind: CipherKind, key: Arc<[u8]>) -> Self {
        Self {
            kind,
            key,
            cipher: None,
            stage: ReadStage::Salt,
            incoming: BytesMut::new(),
            plaintext: BytesMut::new(),
            scratch: vec![0u8; READ_CHUNK].into_boxed_slice(),
            eof: false,
        }
    }

    /// Advance one stage if enough ciphertext is buffered
    ///
    /// Returns `false` when more input is needed.
    fn decode(&mut self) -> io::Result<bool> {
        match self.stage {
            ReadStage::Salt => {
                let salt_len = self.kind.salt_len();
                if self.incoming.len() < salt_len {
                    return Ok(false);
                }
                let salt = self.incoming.split_to(salt_len);
                self.cipher = Some(AeadCipher::new(self.kind, &self.key, &salt)?);
                self.stage = ReadStage::Length;
            }
            ReadStage::Length => {
                if self.incoming.len() < LENGTH_BLOCK_LEN {
                    return Ok(false);
                }
                let mut block = self.incoming.split_to(LENGTH_BLOCK_LEN);
                let len = self.cipher_mut()?.open(&mut block)?;
                let len = u16::from_be_bytes([len[0], len[1]]) as usize & MAX_PAYLOAD_LEN;
                self.stage = ReadStage::Payload(len);
            }
            ReadStage::Payload(len) => {
                if self.incoming.len() < len + TAG_LEN {
                    return Ok(false);
                }
                let mut block = self.incoming.split_to(len + TAG_LEN);
                let plain_len = self.cipher_mut()?.open(&mut block)?.len();
                block.truncate(plain_len);
                self.plaintext = block;
                self.stage = ReadStage::Length;
            }
        }
        Ok(true)
    }

    fn cipher_mut(&mut self) -> io::Result<&mut AeadCipher> {
        self.cipher
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "chunk before salt"))
    }

    /// Pull more ciphertext from the inner stream
    fn poll_fill<S: AsyncRead + Unpin>(
        &mut self,
        inner: &mut S,
        cx: &mut Context<'_>,
    ) -> Poll<io::Result<()>> {
        let mut read_buf = ReadBuf::new(&mut self.scratch);
        ready!(Pin::new(inner).poll_read(cx, &mut read_buf))?;

        let filled = read_buf.filled();
        if filled.is_empty() {
            self.eof = true;
        } else {
            self.incoming.extend_from_slice(filled);
        }
        Poll::Ready(Ok(()))
    }

    /// EOF is only clean between chunks
    fn eof_result(&self) -> io::Result<()> {
        let at_boundary = matches!(self.stage, ReadStage::Salt | ReadStage::Length);
        if at_boundary && self.incoming.is_empty() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream ended inside an encrypted chunk",
            ))
        }
    }
}

/// Write all of `pending` to `inner`
fn poll_drain<S: AsyncWrite + Unpin>(
    inner: &mut S,
    pending: &mut BytesMut,
    cx: &mut Context<'_>,
) -> Poll<io::Result<()>> {
    while !pending.is_empty() {
        let n = ready!(Pin::new(&mut *inner).poll_write(cx, pending))?;
        if n == 0 {
            return Poll::Ready(Err(io::ErrorKind::WriteZero.into()));
        }
        pending.advance(n);
    }
    Poll::Ready(Ok(()))
}

impl<S: AsyncRead + Unpin> AsyncRead for CipherStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let dec = match &mut this.decryptor {
            Some(dec) => dec,
            None => return Pin::new(&mut this.inner).poll_read(cx, buf),
        };

        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        loop {
            if !dec.plaintext.is_empty() {
                let n = dec.plaintext.len().min(buf.remaining());
                buf.put_slice(&dec.plaintext[..n]);
                dec.plaintext.advance(n);
                return Poll::Ready(Ok(()));
            }

            if dec.decode()? {
                continue;
            }

            if dec.eof {
                return Poll::Ready(dec.eof_result());
            }

            ready!(dec.poll_fill(&mut this.inner, cx))?;
        }
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for CipherStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let enc = match &mut this.encryptor {
            Some(enc) => enc,
            None => return Pin::new(&mut this.inner).poll_write(cx, buf),
        };

        ready!(poll_drain(&mut this.inner, &mut enc.pending, cx))?;

        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }

        let n = buf.len().min(MAX_PAYLOAD_LEN);
        enc.seal_chunk(&buf[..n])?;

        // Start sending right away; leftovers go out on the next write or flush
        if let Poll::Ready(Err(e)) = poll_drain(&mut this.inner, &mut enc.pending, cx) {
            return Poll::Ready(Err(e));
        }
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Some(enc) = &mut this.encryptor {
            ready!(poll_drain(&mut this.inner, &mut enc.pending, cx))?;
        }
        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Some(enc) = &mut this.encryptor {
            ready!(poll_drain(&mut this.inner, &mut enc.pending, cx))?;
        }
        Pin::new(&mut this.inner).poll_shutdown(cx)
    }
}
