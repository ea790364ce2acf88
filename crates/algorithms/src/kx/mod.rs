//! Key exchange

mod x25519;

pub use x25519::X25519;
