//! Hash functions

mod sha2;

pub use sha2::{Sha256, Sha512};
