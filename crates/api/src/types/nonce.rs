//! Nonce (initialization vector) type
//!
//! Nonces are public values with a fixed length per algorithm. Reuse of a
//! nonce under the same key is a caller error; the library documents the
//! invariant but does not track past nonces to enforce it.

use core::fmt;

use crate::error::{validate, Result};

/// A public per-operation value required by most cipher modes
#[derive(Clone, PartialEq, Eq)]
pub struct Nonce {
    data: Vec<u8>,
}

impl Nonce {
    /// Create a nonce from existing bytes
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    /// The empty nonce, for algorithms that do not consume one
    pub fn empty() -> Self {
        Self { data: Vec::new() }
    }

    /// Generate a fresh random nonce of the given length
    pub fn random(length: usize) -> Self {
        use rand::RngCore;
        let mut data = vec![0u8; length];
        rand::rngs::OsRng.fill_bytes(&mut data);
        Self { data }
    }

    /// Create from a slice, if it has the expected length
    pub fn with_length(slice: &[u8], expected: usize) -> Result<Self> {
        validate::length("Nonce", slice.len(), expected)?;
        Ok(Self::new(slice.to_vec()))
    }

    /// Get the length of the nonce in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the nonce is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl AsRef<[u8]> for Nonce {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl From<Vec<u8>> for Nonce {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nonce(")?;
        for byte in &self.data {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}
