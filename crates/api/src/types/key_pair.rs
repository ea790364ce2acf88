//! Asymmetric key material
//!
//! A [`KeyPair`] exclusively owns its private material (it is neither
//! `Clone` nor byte-accessible by accident); the corresponding
//! [`PublicKey`] may be computed lazily through a derivation stored at
//! construction and is cached after the first request.

use core::fmt;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use crate::error::{Error, Result};
use crate::types::native_handle::NativeHandle;
use crate::types::SecretBytes;

/// Supported elliptic curves for native-delegated ECDSA/ECDH
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum EcCurve {
    /// NIST P-256 (secp256r1)
    P256,
    /// NIST P-384 (secp384r1)
    P384,
    /// NIST P-521 (secp521r1)
    P521,
}

impl EcCurve {
    /// Curve identifier used on the native channel
    pub fn name(&self) -> &'static str {
        match self {
            Self::P256 => "p256",
            Self::P384 => "p384",
            Self::P521 => "p521",
        }
    }

    /// Length of a field element (and of the private scalar) in bytes
    pub fn field_length(&self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }
}

/// Kinds of raw 32-byte scalar/point key material
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum RawKeyKind {
    /// Ed25519 signing keys
    Ed25519,
    /// X25519 key agreement keys
    X25519,
}

/// Public half of an asymmetric key
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum PublicKey {
    /// Elliptic-curve point in affine coordinates
    Ec {
        /// Curve the point lies on
        curve: EcCurve,
        /// X coordinate, big-endian, field length
        x: Vec<u8>,
        /// Y coordinate, big-endian, field length
        y: Vec<u8>,
    },
    /// Raw 32-byte public point (Ed25519/X25519)
    Raw {
        /// Kind of key material
        kind: RawKeyKind,
        /// Encoded public point
        bytes: Vec<u8>,
    },
    /// RSA public material
    Rsa {
        /// Modulus, big-endian
        n: Vec<u8>,
        /// Public exponent, big-endian
        e: Vec<u8>,
    },
}

/// RSA private material with the full CRT parameter set
pub struct RsaPrivateKey {
    /// Modulus, big-endian
    pub n: Vec<u8>,
    /// Public exponent, big-endian
    pub e: Vec<u8>,
    /// Private exponent
    pub d: SecretBytes,
    /// First prime factor
    pub p: SecretBytes,
    /// Second prime factor
    pub q: SecretBytes,
    /// d mod (p-1)
    pub dp: SecretBytes,
    /// d mod (q-1)
    pub dq: SecretBytes,
    /// q^-1 mod p
    pub qi: SecretBytes,
}

impl fmt::Debug for RsaPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RsaPrivateKey(n={} bytes)[REDACTED]", self.n.len())
    }
}

/// Private material variants owned by a [`KeyPair`]
#[derive(Debug)]
pub enum PrivateMaterial {
    /// Elliptic-curve scalar with its public point
    Ec {
        /// Curve the key belongs to
        curve: EcCurve,
        /// Private scalar, big-endian, field length
        d: SecretBytes,
        /// Public X coordinate
        x: Vec<u8>,
        /// Public Y coordinate
        y: Vec<u8>,
    },
    /// Raw 32-byte private scalar/seed
    Raw {
        /// Kind of key material
        kind: RawKeyKind,
        /// Private scalar or seed
        private: SecretBytes,
    },
    /// RSA private material
    Rsa(Box<RsaPrivateKey>),
}

type PublicKeyDerivation = Box<dyn Fn(&SecretBytes) -> Result<PublicKey> + Send + Sync>;

/// An asymmetric key pair
///
/// The public key is derived on first request and cached; for variants
/// whose public half is known at construction it is pre-populated.
pub struct KeyPair {
    private: PrivateMaterial,
    public: OnceLock<PublicKey>,
    derive: Option<PublicKeyDerivation>,
    handles: Mutex<HashMap<&'static str, NativeHandle>>,
}

impl KeyPair {
    /// Create an elliptic-curve key pair; the public point is known up front
    pub fn ec(curve: EcCurve, d: SecretBytes, x: Vec<u8>, y: Vec<u8>) -> Self {
        let public = OnceLock::new();
        let _ = public.set(PublicKey::Ec {
            curve,
            x: x.clone(),
            y: y.clone(),
        });
        Self {
            private: PrivateMaterial::Ec { curve, d, x, y },
            public,
            derive: None,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Create a raw key pair whose public key is derived lazily
    pub fn raw<F>(kind: RawKeyKind, private: SecretBytes, derive: F) -> Self
    where
        F: Fn(&SecretBytes) -> Result<PublicKey> + Send + Sync + 'static,
    {
        Self {
            private: PrivateMaterial::Raw { kind, private },
            public: OnceLock::new(),
            derive: Some(Box::new(derive)),
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Create an RSA key pair; the public half is part of the material
    pub fn rsa(material: RsaPrivateKey) -> Self {
        let public = OnceLock::new();
        let _ = public.set(PublicKey::Rsa {
            n: material.n.clone(),
            e: material.e.clone(),
        });
        Self {
            private: PrivateMaterial::Rsa(Box::new(material)),
            public,
            derive: None,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// The private material; treat as sensitive
    pub fn material(&self) -> &PrivateMaterial {
        &self.private
    }

    /// The public key, derived and cached on first request
    ///
    /// Derivation may be expensive (a scalar multiplication), so callers
    /// on latency-sensitive paths should hold on to the returned value.
    pub async fn public_key(&self) -> Result<&PublicKey> {
        if let Some(public) = self.public.get() {
            return Ok(public);
        }
        let derived = match (&self.derive, &self.private) {
            (Some(derive), PrivateMaterial::Raw { private, .. }) => derive(private)?,
            _ => {
                return Err(Error::param(
                    "KeyPair::public_key",
                    "no public key and no derivation available",
                ))
            }
        };
        // A concurrent deriver may have won the race; either value is valid.
        Ok(self.public.get_or_init(|| derived))
    }

    /// Look up a cached native handle for the given algorithm token
    pub fn native_handle(&self, token: &'static str) -> Option<NativeHandle> {
        self.handles
            .lock()
            .expect("key pair mutex poisoned")
            .get(token)
            .copied()
    }

    /// Cache a native handle for the given algorithm token
    pub fn cache_native_handle(&self, token: &'static str, handle: NativeHandle) {
        self.handles
            .lock()
            .expect("key pair mutex poisoned")
            .insert(token, handle);
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.private {
            PrivateMaterial::Ec { curve, .. } => write!(f, "KeyPair({})", curve.name()),
            PrivateMaterial::Raw { kind, .. } => write!(f, "KeyPair({:?})", kind),
            PrivateMaterial::Rsa(_) => write!(f, "KeyPair(rsa)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn lazy_public_key_derives_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let pair = KeyPair::raw(
            RawKeyKind::X25519,
            SecretBytes::from_slice(&[5u8; 32]),
            move |private| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(PublicKey::Raw {
                    kind: RawKeyKind::X25519,
                    bytes: private.as_ref().iter().map(|b| b ^ 0xff).collect(),
                })
            },
        );
        let first = pair.public_key().await.unwrap().clone();
        let second = pair.public_key().await.unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ec_public_key_is_preset() {
        let pair = KeyPair::ec(
            EcCurve::P256,
            SecretBytes::from_slice(&[1u8; 32]),
            vec![2u8; 32],
            vec![3u8; 32],
        );
        match pair.public_key().await.unwrap() {
            PublicKey::Ec { curve, x, y } => {
                assert_eq!(*curve, EcCurve::P256);
                assert_eq!(x, &vec![2u8; 32]);
                assert_eq!(y, &vec![3u8; 32]);
            }
            other => panic!("unexpected public key {:?}", other),
        }
    }
}
