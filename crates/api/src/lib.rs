//! Public API traits and types for the xcrypt library
//!
//! This crate provides the public API surface for the xcrypt ecosystem:
//! algorithm contracts, secret/public material value types, the
//! encryption envelope and the unified error system. Concrete
//! implementations live in `xcrypt-algorithms` (pure portable) and
//! `xcrypt-native` (delegating to platform backends).

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at the crate level for convenience
pub use error::{Error, Result};
pub use types::*;

// Re-export all contracts from the traits module
pub use traits::{
    Cipher, DecryptorSink, EncryptorSink, HashAlgorithm, HashSink, KeyExchangeAlgorithm,
    KeystreamCipher, MacAlgorithm, MacSink, SignatureAlgorithm, StreamingCipher,
};
