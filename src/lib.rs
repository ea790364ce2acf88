//! # xcrypt
//!
//! A cross-platform cryptography library: one set of algorithm
//! contracts usable identically whether the concrete implementation is a
//! pure portable algorithm or a platform-accelerated native backend.
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! xcrypt = "0.3"
//! ```
//!
//! ## Crate Structure
//!
//! This is a facade crate that re-exports functionality from several
//! sub-crates:
//!
//! - [`xcrypt-api`]: algorithm contracts, key material types, errors
//! - [`xcrypt-algorithms`]: pure portable implementations and the
//!   authenticated-encryption composition layer
//! - [`xcrypt-native`]: the native channel contract, the admission
//!   control queue and the delegating wrappers
//!
//! ## Picking an implementation
//!
//! Pure implementations work everywhere:
//!
//! ```
//! use xcrypt::prelude::*;
//! use xcrypt::algorithms::Chacha20Poly1305;
//!
//! # async fn demo() -> xcrypt::api::Result<()> {
//! let cipher = Chacha20Poly1305::new();
//! let key = cipher.new_secret_key().await?;
//! let sealed = cipher.encrypt(b"hello", &key, None, &[]).await?;
//! let opened = cipher.decrypt(&sealed, &key, &[]).await?;
//! assert_eq!(opened, b"hello");
//! # Ok(())
//! # }
//! ```
//!
//! On platforms with a native backend, wrap the pure implementation in a
//! delegating one; calls inside the size policy window are routed
//! through the admission-controlled native channel, everything else
//! (and every platform without support) uses the fallback with
//! identical results.

pub use xcrypt_algorithms as algorithms;
pub use xcrypt_api as api;
pub use xcrypt_native as native;

/// Common imports for xcrypt users
pub mod prelude {
    // Re-export error types
    pub use crate::api::{Error, Result};

    // Re-export core contracts
    pub use crate::api::{
        Cipher, DecryptorSink, EncryptorSink, HashAlgorithm, HashSink, KeyExchangeAlgorithm,
        KeystreamCipher, MacAlgorithm, MacSink, SignatureAlgorithm, StreamingCipher,
    };

    // Re-export material types
    pub use crate::api::{
        Digest, EcCurve, KeyPair, Mac, Nonce, PublicKey, SecretBox, SecretBytes, SecretKey,
        Signature,
    };

    // Re-export the delegation surface
    pub use crate::native::{
        AdmissionQueue, AlgorithmFamily, ChannelPolicy, DelegatingCipher, NativeContext,
        NativeSupport,
    };
}
