//! Digital signature contract

use core::fmt;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{KeyPair, Signature};

/// Contract for digital signature algorithms
///
/// Key generation is suspending: it may be randomness- or hardware-bound.
#[async_trait]
pub trait SignatureAlgorithm: Send + Sync + fmt::Debug {
    /// Human-readable algorithm name
    fn name(&self) -> &str;

    /// Signature length in bytes
    fn signature_length(&self) -> usize;

    /// Generate a new key pair
    async fn new_key_pair(&self) -> Result<KeyPair>;

    /// Sign a message with the pair's private key
    ///
    /// The returned [`Signature`] carries the verifying public key.
    async fn sign(&self, message: &[u8], key_pair: &KeyPair) -> Result<Signature>;

    /// Verify a signature against a message
    ///
    /// Returns `Ok(false)` for a well-formed but invalid signature;
    /// errors are reserved for malformed input and backend failures.
    async fn verify(&self, message: &[u8], signature: &Signature) -> Result<bool>;
}
