//! Unauthenticated stream ciphers with seekable keystreams

mod aes_ctr;
mod chacha20;

pub use aes_ctr::{AesCtr, AES_BLOCK_SIZE, AES_CTR_NONCE_SIZE};
pub use chacha20::{Chacha20, CHACHA20_BLOCK_SIZE, CHACHA20_KEY_SIZE, CHACHA20_NONCE_SIZE};
