//! Key exchange contract

use core::fmt;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{KeyPair, PublicKey, SecretKey};

/// Contract for key agreement algorithms
#[async_trait]
pub trait KeyExchangeAlgorithm: Send + Sync + fmt::Debug {
    /// Human-readable algorithm name
    fn name(&self) -> &str;

    /// Generate a new key pair
    async fn new_key_pair(&self) -> Result<KeyPair>;

    /// Derive the shared secret from a local pair and a remote public key
    async fn shared_secret_key(
        &self,
        key_pair: &KeyPair,
        remote_public_key: &PublicKey,
    ) -> Result<SecretKey>;
}
