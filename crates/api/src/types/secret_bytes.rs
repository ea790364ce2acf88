//! Securely-zeroed byte container for secret key material

use core::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{validate, Result};

/// A variable-length byte container that is securely zeroed when dropped
///
/// Provides constant-time equality and a `Debug` implementation that
/// hides the actual bytes.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes {
    data: Vec<u8>,
}

impl SecretBytes {
    /// Create a new instance from an existing vector
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Create by copying from a slice
    pub fn from_slice(slice: &[u8]) -> Self {
        Self {
            data: slice.to_vec(),
        }
    }

    /// Create by copying from a slice, if it has the expected length
    pub fn with_length(slice: &[u8], expected: usize) -> Result<Self> {
        validate::length("SecretBytes", slice.len(), expected)?;
        Ok(Self::from_slice(slice))
    }

    /// Generate a random instance of the given length
    pub fn random(length: usize) -> Self {
        use rand::RngCore;
        let mut data = vec![0u8; length];
        rand::rngs::OsRng.fill_bytes(&mut data);
        Self { data }
    }

    /// Get the length of the contained data
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the container is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl AsRef<[u8]> for SecretBytes {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl From<Vec<u8>> for SecretBytes {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl PartialEq for SecretBytes {
    fn eq(&self, other: &Self) -> bool {
        self.data.ct_eq(&other.data).into()
    }
}

impl Eq for SecretBytes {}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes({})[REDACTED]", self.data.len())
    }
}
