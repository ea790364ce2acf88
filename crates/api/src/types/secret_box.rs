//! The canonical authenticated-encryption envelope

use core::fmt;

use crate::error::{Error, Result};
use crate::types::{Mac, Nonce};

/// Output of an encryption operation: nonce, cipher text and tag
///
/// The cipher text length is always a pure function of the clear text
/// length for the algorithm that produced the box; the producing and
/// consuming code treats any disagreement as a fatal internal
/// inconsistency, not a recoverable error.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretBox {
    nonce: Nonce,
    cipher_text: Vec<u8>,
    mac: Mac,
}

impl SecretBox {
    /// Assemble an envelope from its parts
    pub fn new(nonce: Nonce, cipher_text: Vec<u8>, mac: Mac) -> Self {
        Self {
            nonce,
            cipher_text,
            mac,
        }
    }

    /// The nonce the cipher text was produced under
    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    /// The encrypted payload
    pub fn cipher_text(&self) -> &[u8] {
        &self.cipher_text
    }

    /// The authentication tag; empty for unauthenticated ciphers
    pub fn mac(&self) -> &Mac {
        &self.mac
    }

    /// Wire encoding: `nonce || cipher_text || mac`
    pub fn concatenation(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(self.nonce.len() + self.cipher_text.len() + self.mac.len());
        out.extend_from_slice(self.nonce.as_ref());
        out.extend_from_slice(&self.cipher_text);
        out.extend_from_slice(self.mac.as_ref());
        out
    }

    /// Parse the wire encoding given the algorithm's fixed lengths
    pub fn from_concatenation(
        bytes: &[u8],
        nonce_length: usize,
        mac_length: usize,
    ) -> Result<Self> {
        if bytes.len() < nonce_length + mac_length {
            return Err(Error::InvalidLength {
                context: "SecretBox::from_concatenation",
                expected: nonce_length + mac_length,
                actual: bytes.len(),
            });
        }
        let (nonce, rest) = bytes.split_at(nonce_length);
        let (cipher_text, mac) = rest.split_at(rest.len() - mac_length);
        Ok(Self {
            nonce: Nonce::new(nonce.to_vec()),
            cipher_text: cipher_text.to_vec(),
            mac: Mac::new(mac.to_vec()),
        })
    }
}

impl fmt::Debug for SecretBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SecretBox(nonce={}, cipher_text={} bytes, mac={})",
            self.nonce.len(),
            self.cipher_text.len(),
            self.mac.len()
        )
    }
}
