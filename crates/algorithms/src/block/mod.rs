//! Block ciphers

mod aes_cbc;

pub use aes_cbc::AesCbc;
