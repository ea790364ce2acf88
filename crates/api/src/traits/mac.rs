//! MAC algorithm contract and incremental sink

use core::fmt;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::{Mac, Nonce, SecretKey};

/// Contract for message authentication codes
///
/// The sink shape mirrors [`crate::traits::HashSink`] but is keyed by a
/// [`SecretKey`]. Some MACs additionally consume a nonce and associated
/// data (the ChaCha20-Poly1305 AEAD tag); HMAC ignores both.
#[async_trait]
pub trait MacAlgorithm: Send + Sync + fmt::Debug {
    /// Human-readable algorithm name
    fn name(&self) -> &'static str;

    /// Tag length in bytes
    fn mac_length(&self) -> usize;

    /// Whether associated data participates in the tag
    fn supports_aad(&self) -> bool {
        false
    }

    /// Whether a key of the given length is usable
    fn supports_key_length(&self, length: usize) -> bool;

    /// Compute the tag over `data`
    async fn calculate(
        &self,
        data: &[u8],
        key: &SecretKey,
        nonce: &Nonce,
        aad: &[u8],
    ) -> Result<Mac> {
        let mut sink = self.new_sink(key, nonce, aad).await?;
        sink.add(data)?;
        Ok(sink.close())
    }

    /// Immediate form of [`MacAlgorithm::calculate`]
    fn calculate_sync(
        &self,
        _data: &[u8],
        _key: &SecretKey,
        _nonce: &Nonce,
        _aad: &[u8],
    ) -> Result<Mac> {
        Err(Error::Unsupported {
            operation: "synchronous MAC calculation",
        })
    }

    /// Open a keyed incremental sink
    async fn new_sink(
        &self,
        key: &SecretKey,
        nonce: &Nonce,
        aad: &[u8],
    ) -> Result<Box<dyn MacSink>>;
}

/// Incremental MAC sink
///
/// Closing twice is idempotent and returns the same tag; adding after
/// close fails with a sink-closed error.
pub trait MacSink: Send {
    /// Absorb one chunk
    fn add(&mut self, chunk: &[u8]) -> Result<()>;

    /// Absorb `chunk[start..end]`; `is_last` closes the sink
    fn add_slice(&mut self, chunk: &[u8], start: usize, end: usize, is_last: bool) -> Result<()>;

    /// Finalize and return the tag
    fn close(&mut self) -> Mac;
}
