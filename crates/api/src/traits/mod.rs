//! Algorithm contracts
//!
//! The traits every concrete implementation satisfies, whether pure
//! portable or native-delegating. All contracts are object-safe so that
//! implementations compose behind `dyn` without knowing each other.

pub mod cipher;
pub mod hash;
pub mod key_exchange;
pub mod mac;
pub mod signature;

pub use cipher::{
    Cipher, DecryptorSink, EncryptorSink, KeystreamCipher, StreamingCipher,
};
pub use hash::{HashAlgorithm, HashSink};
pub use key_exchange::KeyExchangeAlgorithm;
pub use mac::{MacAlgorithm, MacSink};
pub use signature::SignatureAlgorithm;
