//! Hash algorithm contract and incremental sink

use core::fmt;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Digest;

/// Contract for cryptographic hash functions
#[async_trait]
pub trait HashAlgorithm: Send + Sync + fmt::Debug {
    /// Human-readable algorithm name
    fn name(&self) -> &str;

    /// Digest length in bytes
    fn digest_length(&self) -> usize;

    /// Internal block length in bytes (relevant to HMAC construction)
    fn block_length(&self) -> usize;

    /// Open a fresh incremental sink
    fn new_sink(&self) -> Box<dyn HashSink>;

    /// One-shot immediate hash
    fn hash_sync(&self, data: &[u8]) -> Result<Digest> {
        let mut sink = self.new_sink();
        sink.add(data)?;
        Ok(sink.close())
    }

    /// One-shot suspending hash
    async fn hash(&self, data: &[u8]) -> Result<Digest> {
        self.hash_sync(data)
    }
}

/// Incremental hashing sink
///
/// Closing twice is idempotent and returns the same digest; adding after
/// close fails with a sink-closed error.
pub trait HashSink: Send {
    /// Absorb one chunk
    fn add(&mut self, chunk: &[u8]) -> Result<()>;

    /// Absorb `chunk[start..end]`; `is_last` closes the sink
    fn add_slice(&mut self, chunk: &[u8], start: usize, end: usize, is_last: bool) -> Result<()>;

    /// Finalize and return the digest
    fn close(&mut self) -> Digest;
}
