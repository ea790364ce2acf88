//! Message authentication codes

mod hmac;
mod poly1305_aead;

pub use hmac::Hmac;
pub use poly1305_aead::{Poly1305AeadMac, POLY1305_TAG_SIZE};

pub(crate) use poly1305_aead::{aead_tag, poly1305_key};
