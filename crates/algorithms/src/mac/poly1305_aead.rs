//! Poly1305 as the ChaCha20 AEAD tag (RFC 8439 section 2.8)
//!
//! The one-time Poly1305 key is the first 32 bytes of the ChaCha20
//! keystream at block 0 for the message nonce; the tag covers
//! `aad || pad || cipher_text || pad || le64(aad_len) || le64(ct_len)`.

use async_trait::async_trait;
use poly1305::universal_hash::{KeyInit, UniversalHash};
use poly1305::{Block, Key, Poly1305};

use xcrypt_api::error::{validate, Error, Result};
use xcrypt_api::{Mac, MacAlgorithm, MacSink, Nonce, SecretKey};

use crate::stream::{Chacha20, CHACHA20_KEY_SIZE, CHACHA20_NONCE_SIZE};

/// Size of the Poly1305 tag in bytes
pub const POLY1305_TAG_SIZE: usize = 16;

/// Derive the one-time Poly1305 key from keystream block 0
pub(crate) fn poly1305_key(key: &[u8], nonce: &[u8]) -> Result<[u8; 32]> {
    let mut poly_key = [0u8; 32];
    Chacha20::apply_keystream(key, nonce, 0, &mut poly_key)?;
    Ok(poly_key)
}

/// Compute the RFC 8439 AEAD tag
pub(crate) fn aead_tag(poly_key: &[u8; 32], aad: &[u8], cipher_text: &[u8]) -> Mac {
    let mut poly = Poly1305::new(Key::from_slice(poly_key));
    poly.update_padded(aad);
    poly.update_padded(cipher_text);

    let mut lengths = Block::default();
    lengths[..8].copy_from_slice(&(aad.len() as u64).to_le_bytes());
    lengths[8..].copy_from_slice(&(cipher_text.len() as u64).to_le_bytes());
    poly.update(&[lengths]);

    Mac::new(poly.finalize().as_slice().to_vec())
}

/// The ChaCha20-keyed Poly1305 AEAD MAC as a standalone algorithm
///
/// Requires the message nonce (the same one the cipher text was produced
/// under) and supports associated data.
#[derive(Clone, Copy, Debug, Default)]
pub struct Poly1305AeadMac;

impl Poly1305AeadMac {
    /// Create the MAC algorithm
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MacAlgorithm for Poly1305AeadMac {
    fn name(&self) -> &'static str {
        "POLY1305-AEAD"
    }

    fn mac_length(&self) -> usize {
        POLY1305_TAG_SIZE
    }

    fn supports_aad(&self) -> bool {
        true
    }

    fn supports_key_length(&self, length: usize) -> bool {
        length == CHACHA20_KEY_SIZE
    }

    fn calculate_sync(
        &self,
        data: &[u8],
        key: &SecretKey,
        nonce: &Nonce,
        aad: &[u8],
    ) -> Result<Mac> {
        validate::length("POLY1305-AEAD nonce", nonce.len(), CHACHA20_NONCE_SIZE)?;
        let key = key.extract_sync()?;
        validate::length("POLY1305-AEAD key", key.len(), CHACHA20_KEY_SIZE)?;
        let poly_key = poly1305_key(key.as_ref(), nonce.as_ref())?;
        Ok(aead_tag(&poly_key, aad, data))
    }

    async fn new_sink(
        &self,
        key: &SecretKey,
        nonce: &Nonce,
        aad: &[u8],
    ) -> Result<Box<dyn MacSink>> {
        validate::length("POLY1305-AEAD nonce", nonce.len(), CHACHA20_NONCE_SIZE)?;
        let key = key.extract().await?;
        validate::length("POLY1305-AEAD key", key.len(), CHACHA20_KEY_SIZE)?;
        Ok(Box::new(Poly1305AeadSink {
            poly_key: poly1305_key(key.as_ref(), nonce.as_ref())?,
            aad: aad.to_vec(),
            data: Vec::new(),
            tag: None,
        }))
    }
}

struct Poly1305AeadSink {
    poly_key: [u8; 32],
    aad: Vec<u8>,
    data: Vec<u8>,
    tag: Option<Mac>,
}

impl MacSink for Poly1305AeadSink {
    fn add(&mut self, chunk: &[u8]) -> Result<()> {
        if self.tag.is_some() {
            return Err(Error::SinkClosed {
                context: "POLY1305-AEAD",
            });
        }
        self.data.extend_from_slice(chunk);
        Ok(())
    }

    fn add_slice(&mut self, chunk: &[u8], start: usize, end: usize, is_last: bool) -> Result<()> {
        validate::parameter(
            start <= end && end <= chunk.len(),
            "slice",
            "start/end out of bounds",
        )?;
        self.add(&chunk[start..end])?;
        if is_last {
            self.close();
        }
        Ok(())
    }

    fn close(&mut self) -> Mac {
        if let Some(tag) = &self.tag {
            return tag.clone();
        }
        let tag = aead_tag(&self.poly_key, &self.aad, &self.data);
        self.tag = Some(tag.clone());
        tag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rfc8439_tag_vector() {
        // RFC 8439 section 2.8.2: the tag over the example cipher text.
        let key = SecretKey::new(
            hex::decode("808182838485868788898a8b8c8d8e8f909192939495969798999a9b9c9d9e9f")
                .unwrap(),
        );
        let nonce = Nonce::new(hex::decode("070000004041424344454647").unwrap());
        let aad = hex::decode("50515253c0c1c2c3c4c5c6c7").unwrap();
        let cipher_text = hex::decode(
            "d31a8d34648e60db7b86afbc53ef7ec2a4aded51296e08fea9e2b5a736ee62d6\
             3dbea45e8ca9671282fafb69da92728b1a71de0a9e060b2905d6a5b67ecd3b36\
             92ddbd7f2d778b8c9803aee328091b58fab324e4fad675945585808b4831d7bc\
             3ff4def08e4b7a9de576d26586cec64b6116",
        )
        .unwrap();

        let tag = Poly1305AeadMac::new()
            .calculate(&cipher_text, &key, &nonce, &aad)
            .await
            .unwrap();
        assert_eq!(
            tag.as_ref(),
            hex::decode("1ae10b594f09e26a7e902ecbd0600691").unwrap()
        );
    }

    #[tokio::test]
    async fn sink_matches_one_shot() {
        let key = SecretKey::random(32);
        let nonce = Nonce::random(12);
        let mac = Poly1305AeadMac::new();
        let mut sink = mac.new_sink(&key, &nonce, b"header").await.unwrap();
        sink.add(b"split ").unwrap();
        sink.add(b"input").unwrap();
        let tag = sink.close();
        let oneshot = mac
            .calculate(b"split input", &key, &nonce, b"header")
            .await
            .unwrap();
        assert_eq!(tag, oneshot);
        assert_eq!(tag, sink.close());
    }
}
