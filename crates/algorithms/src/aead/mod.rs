//! Authenticated encryption with associated data

mod chacha20poly1305;
mod gcm;

pub use chacha20poly1305::Chacha20Poly1305;
pub use gcm::{AesGcm, AES_GCM_NONCE_SIZE, AES_GCM_TAG_SIZE};
