//! Pure, portable implementations of the xcrypt algorithm contracts
//!
//! Every type in this crate implements the contracts from `xcrypt-api`
//! with no platform dependency; these are the fallback implementations
//! the delegation layer in `xcrypt-native` wraps. The primitive bit-math
//! comes from the audited RustCrypto cores; this crate owns the contract
//! plumbing, envelope handling, padding and MAC wiring around them.
//!
//! Synchronous contract forms are fully supported here: pure backends
//! never suspend once key material is resident.

#![forbid(unsafe_code)]

pub mod aead;
pub mod block;
pub mod compose;
pub mod hash;
pub mod kx;
pub mod mac;
pub mod sign;
pub mod stream;
pub mod streaming;

// Re-export main types for convenience
pub use aead::{AesGcm, Chacha20Poly1305};
pub use block::AesCbc;
pub use compose::{AuthenticatedCipher, CipherWithAppendedMac};
pub use hash::{Sha256, Sha512};
pub use kx::X25519;
pub use mac::{Hmac, Poly1305AeadMac};
pub use sign::Ed25519;
pub use stream::{AesCtr, Chacha20};

// Re-export the API error system instead of custom error types
pub use xcrypt_api::error::{Error, Result};
