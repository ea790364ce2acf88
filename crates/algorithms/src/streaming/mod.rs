//! Incremental cipher sinks

mod chacha20poly1305;

pub use chacha20poly1305::{Chacha20Poly1305Decryptor, Chacha20Poly1305Encryptor};
