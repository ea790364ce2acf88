//! Digital signatures

use core::fmt;

use crate::types::PublicKey;

/// Signature bytes bundled with the public key that verifies them
///
/// Self-describing: verification never needs an external key lookup.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature {
    bytes: Vec<u8>,
    public_key: PublicKey,
}

impl Signature {
    /// Create a signature from its bytes and the verifying public key
    pub fn new(bytes: impl Into<Vec<u8>>, public_key: PublicKey) -> Self {
        Self {
            bytes: bytes.into(),
            public_key,
        }
    }

    /// The raw signature bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The public key that verifies this signature
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({} bytes, {:?})", self.bytes.len(), self.public_key)
    }
}
