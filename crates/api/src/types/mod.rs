//! Secret/public material value types
//!
//! Value types for keys, nonces, tags, digests, signatures and the
//! encryption envelope. No behavior beyond validation and constant-time
//! comparison lives here.

mod digest;
mod key_pair;
mod mac;
mod native_handle;
mod nonce;
mod secret_box;
mod secret_bytes;
mod secret_key;
mod signature;

pub use digest::Digest;
pub use key_pair::{EcCurve, KeyPair, PrivateMaterial, PublicKey, RawKeyKind, RsaPrivateKey};
pub use mac::Mac;
pub use native_handle::NativeHandle;
pub use nonce::Nonce;
pub use secret_box::SecretBox;
pub use secret_bytes::SecretBytes;
pub use secret_key::SecretKey;
pub use signature::Signature;
