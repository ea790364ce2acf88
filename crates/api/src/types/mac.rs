//! Message authentication tags

use core::fmt;
use subtle::ConstantTimeEq;

use crate::error::{validate, Result};

/// A fixed-length message authentication tag
///
/// Equality is constant-time. A length mismatch is folded into the
/// comparison result without an early exit; lengths themselves are public.
#[derive(Clone)]
pub struct Mac {
    data: Vec<u8>,
}

impl Mac {
    /// Create a tag from existing bytes
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    /// The empty tag, used by unauthenticated ciphers
    pub fn empty() -> Self {
        Self { data: Vec::new() }
    }

    /// Create from a slice, if it has the expected length
    pub fn with_length(slice: &[u8], expected: usize) -> Result<Self> {
        validate::length("Mac", slice.len(), expected)?;
        Ok(Self::new(slice.to_vec()))
    }

    /// Get the length of the tag in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the tag is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl AsRef<[u8]> for Mac {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl PartialEq for Mac {
    fn eq(&self, other: &Self) -> bool {
        // Iterate over the longer of the two so the work done does not
        // depend on where a mismatch occurs.
        let len = self.data.len().max(other.data.len());
        let mut diff = 0u8;
        for i in 0..len {
            let a = self.data.get(i).copied().unwrap_or(0);
            let b = other.data.get(i).copied().unwrap_or(0);
            diff |= a ^ b;
        }
        diff |= (self.data.len() ^ other.data.len()) as u8;
        diff.ct_eq(&0u8).into()
    }
}

impl Eq for Mac {}

impl fmt::Debug for Mac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mac(")?;
        for byte in &self.data {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}
