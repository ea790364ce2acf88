//! Symmetric secret keys with optionally deferred material
//!
//! A [`SecretKey`] either owns its raw bytes outright or is backed by an
//! asynchronous derivation (for example from a seed) that runs on first
//! extraction and is memoized. Extraction is therefore fallible and
//! suspending, not a pure accessor.

use core::fmt;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;

use crate::error::{Error, Result};
use crate::types::native_handle::NativeHandle;
use crate::types::SecretBytes;

type DeriveFuture = Pin<Box<dyn Future<Output = Result<SecretBytes>> + Send>>;

struct Material {
    bytes: OnceCell<SecretBytes>,
    pending: Mutex<Option<DeriveFuture>>,
    // Algorithm token -> opaque handle issued by a native channel.
    // Idempotent, last-write-wins; never extends the key's lifetime.
    handles: Mutex<HashMap<&'static str, NativeHandle>>,
}

/// A symmetric secret key
///
/// Cloning is cheap and shares the underlying material and native-handle
/// cache. There is no `PartialEq` implementation: compare extracted bytes
/// with [`SecretKey::constant_time_eq`], or rely on identity/length checks
/// outside constant-time paths.
#[derive(Clone)]
pub struct SecretKey {
    material: Arc<Material>,
}

impl SecretKey {
    /// Create a key from raw bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self::from_bytes(SecretBytes::new(bytes.into()))
    }

    /// Create a key from an existing [`SecretBytes`]
    pub fn from_bytes(bytes: SecretBytes) -> Self {
        Self {
            material: Arc::new(Material {
                bytes: OnceCell::new_with(Some(bytes)),
                pending: Mutex::new(None),
                handles: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Generate a random key of the given length
    pub fn random(length: usize) -> Self {
        Self::from_bytes(SecretBytes::random(length))
    }

    /// Create a key whose material is derived asynchronously on first use
    ///
    /// The derivation runs at most once; its result (success or failure) is
    /// final. A failed derivation leaves the key permanently unusable.
    pub fn deferred<F>(derivation: F) -> Self
    where
        F: Future<Output = Result<SecretBytes>> + Send + 'static,
    {
        Self {
            material: Arc::new(Material {
                bytes: OnceCell::new(),
                pending: Mutex::new(Some(Box::pin(derivation))),
                handles: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Extract the key material, deriving it first if necessary
    ///
    /// This is a suspension point when the key is deferred and not yet
    /// derived; otherwise it completes immediately.
    pub async fn extract(&self) -> Result<&SecretBytes> {
        self.material
            .bytes
            .get_or_try_init(|| {
                let pending = self
                    .material
                    .pending
                    .lock()
                    .expect("secret key mutex poisoned")
                    .take();
                async move {
                    match pending {
                        Some(derivation) => derivation.await,
                        None => Err(Error::KeyMaterial {
                            context: "SecretKey::extract",
                            message: "key derivation already failed".into(),
                        }),
                    }
                }
            })
            .await
    }

    /// Extract the key material without suspending
    ///
    /// Fails with [`Error::Unsupported`] when the material has not been
    /// derived yet; synchronous callers cannot trigger derivation.
    pub fn extract_sync(&self) -> Result<&SecretBytes> {
        self.material
            .bytes
            .get()
            .ok_or(Error::Unsupported {
                operation: "synchronous extraction of a deferred key",
            })
    }

    /// Length of the key material, if already resident
    pub fn length(&self) -> Option<usize> {
        self.material.bytes.get().map(|b| b.len())
    }

    /// Whether the key material is resident (derived or direct)
    pub fn is_extracted(&self) -> bool {
        self.material.bytes.get().is_some()
    }

    /// Constant-time comparison of two keys' material
    ///
    /// Both keys must be resident; deferred keys that have not been
    /// extracted fail with [`Error::Unsupported`].
    pub fn constant_time_eq(&self, other: &Self) -> Result<bool> {
        let a = self.extract_sync()?;
        let b = other.extract_sync()?;
        Ok(a == b)
    }

    /// Look up a cached native handle for the given algorithm token
    pub fn native_handle(&self, token: &'static str) -> Option<NativeHandle> {
        self.material
            .handles
            .lock()
            .expect("secret key mutex poisoned")
            .get(token)
            .copied()
    }

    /// Cache a native handle for the given algorithm token
    ///
    /// Concurrent recomputation is harmless; the last writer wins.
    pub fn cache_native_handle(&self, token: &'static str, handle: NativeHandle) {
        self.material
            .handles
            .lock()
            .expect("secret key mutex poisoned")
            .insert(token, handle);
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.length() {
            Some(len) => write!(f, "SecretKey({})[REDACTED]", len),
            None => write!(f, "SecretKey(deferred)"),
        }
    }
}
