//! Streaming ChaCha20-Poly1305
//!
//! Incremental sinks over an unbounded, single-pass sequence of chunks.
//! The tag covers everything fed through the sink and only exists at
//! stream completion; `finish` consumes the sink, so the tag is produced
//! (encryption) or verified (decryption) exactly once.

use poly1305::universal_hash::{KeyInit, UniversalHash};
use poly1305::{Block, Key, Poly1305};

use chacha20::cipher::{KeyIvInit, StreamCipher, StreamCipherSeek};

use xcrypt_api::error::{validate, Error, Result};
use xcrypt_api::{DecryptorSink, EncryptorSink, Mac};

use crate::mac::poly1305_key;
use crate::stream::{CHACHA20_BLOCK_SIZE, CHACHA20_KEY_SIZE, CHACHA20_NONCE_SIZE};

const MAC_BLOCK: usize = 16;

/// Incremental Poly1305 over padded AAD + cipher text + length block
struct TagAccumulator {
    poly: Poly1305,
    pending: Vec<u8>,
    aad_length: u64,
    cipher_text_length: u64,
}

impl TagAccumulator {
    fn new(poly_key: &[u8; 32], aad: &[u8]) -> Self {
        let mut poly = Poly1305::new(Key::from_slice(poly_key));
        poly.update_padded(aad);
        Self {
            poly,
            pending: Vec::new(),
            aad_length: aad.len() as u64,
            cipher_text_length: 0,
        }
    }

    fn absorb(&mut self, cipher_text: &[u8]) {
        self.cipher_text_length += cipher_text.len() as u64;
        self.pending.extend_from_slice(cipher_text);
        let full = self.pending.len() / MAC_BLOCK * MAC_BLOCK;
        for block in self.pending[..full].chunks_exact(MAC_BLOCK) {
            self.poly.update(&[Block::clone_from_slice(block)]);
        }
        self.pending.drain(..full);
    }

    fn finalize(mut self) -> Mac {
        // Zero-pad the cipher text remainder, then the length block.
        self.poly.update_padded(&self.pending);
        let mut lengths = Block::default();
        lengths[..8].copy_from_slice(&self.aad_length.to_le_bytes());
        lengths[8..].copy_from_slice(&self.cipher_text_length.to_le_bytes());
        self.poly.update(&[lengths]);
        Mac::new(self.poly.finalize().as_slice().to_vec())
    }
}

fn keystream(key: &[u8], nonce: &[u8]) -> Result<chacha20::ChaCha20> {
    validate::length("ChaCha20-Poly1305 key", key.len(), CHACHA20_KEY_SIZE)?;
    validate::length("ChaCha20-Poly1305 nonce", nonce.len(), CHACHA20_NONCE_SIZE)?;
    let mut cipher = chacha20::ChaCha20::new_from_slices(key, nonce)
        .map_err(|_| Error::param("ChaCha20-Poly1305 key", "rejected by cipher core"))?;
    // Block 0 is reserved for the one-time Poly1305 key.
    cipher.seek(CHACHA20_BLOCK_SIZE as u64);
    Ok(cipher)
}

/// Incremental AEAD encryption
pub struct Chacha20Poly1305Encryptor {
    keystream: chacha20::ChaCha20,
    tag: TagAccumulator,
    closed: bool,
}

impl Chacha20Poly1305Encryptor {
    pub(crate) fn new(key: &[u8], nonce: &[u8], aad: &[u8]) -> Result<Self> {
        let keystream = keystream(key, nonce)?;
        let poly_key = poly1305_key(key, nonce)?;
        Ok(Self {
            keystream,
            tag: TagAccumulator::new(&poly_key, aad),
            closed: false,
        })
    }
}

impl EncryptorSink for Chacha20Poly1305Encryptor {
    fn add(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        if self.closed {
            return Err(Error::SinkClosed {
                context: "ChaCha20-Poly1305 encryptor",
            });
        }
        let mut cipher_text = chunk.to_vec();
        self.keystream.apply_keystream(&mut cipher_text);
        self.tag.absorb(&cipher_text);
        Ok(cipher_text)
    }

    fn add_slice(
        &mut self,
        chunk: &[u8],
        start: usize,
        end: usize,
        is_last: bool,
    ) -> Result<Vec<u8>> {
        validate::parameter(
            start <= end && end <= chunk.len(),
            "slice",
            "start/end out of bounds",
        )?;
        let out = self.add(&chunk[start..end])?;
        if is_last {
            self.closed = true;
        }
        Ok(out)
    }

    fn finish(self: Box<Self>) -> Result<(Vec<u8>, Mac)> {
        Ok((Vec::new(), self.tag.finalize()))
    }
}

/// Incremental AEAD decryption
///
/// Clear text handed out by `add` is unauthenticated until `finish`
/// verifies the tag; callers must buffer or otherwise withhold it until
/// then.
pub struct Chacha20Poly1305Decryptor {
    keystream: chacha20::ChaCha20,
    tag: TagAccumulator,
    closed: bool,
}

impl Chacha20Poly1305Decryptor {
    pub(crate) fn new(key: &[u8], nonce: &[u8], aad: &[u8]) -> Result<Self> {
        let keystream = keystream(key, nonce)?;
        let poly_key = poly1305_key(key, nonce)?;
        Ok(Self {
            keystream,
            tag: TagAccumulator::new(&poly_key, aad),
            closed: false,
        })
    }
}

impl DecryptorSink for Chacha20Poly1305Decryptor {
    fn add(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        if self.closed {
            return Err(Error::SinkClosed {
                context: "ChaCha20-Poly1305 decryptor",
            });
        }
        // The tag covers the cipher text as received.
        self.tag.absorb(chunk);
        let mut clear_text = chunk.to_vec();
        self.keystream.apply_keystream(&mut clear_text);
        Ok(clear_text)
    }

    fn add_slice(
        &mut self,
        chunk: &[u8],
        start: usize,
        end: usize,
        is_last: bool,
    ) -> Result<Vec<u8>> {
        validate::parameter(
            start <= end && end <= chunk.len(),
            "slice",
            "start/end out of bounds",
        )?;
        let out = self.add(&chunk[start..end])?;
        if is_last {
            self.closed = true;
        }
        Ok(out)
    }

    fn finish(self: Box<Self>, expected: &Mac) -> Result<Vec<u8>> {
        let computed = self.tag.finalize();
        validate::authentication(&computed == expected, "ChaCha20-Poly1305")?;
        Ok(Vec::new())
    }
}
