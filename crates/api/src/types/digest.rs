//! Hash digests

use core::fmt;
use subtle::ConstantTimeEq;

/// A fixed-length hash digest with constant-time equality
#[derive(Clone)]
pub struct Digest {
    data: Vec<u8>,
}

impl Digest {
    /// Create a digest from existing bytes
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    /// Get the length of the digest in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the digest is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl PartialEq for Digest {
    fn eq(&self, other: &Self) -> bool {
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

impl Eq for Digest {}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest(")?;
        for byte in &self.data {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}
