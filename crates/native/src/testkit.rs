//! In-process test channel
//!
//! Implements the native call contract over *independent*
//! implementations (the RustCrypto AEAD crates), so conformance tests
//! can require byte-identical output between the pure fallbacks and a
//! "native" backend. Ships fault injection (forced unsupported
//! algorithms, truncated replies, artificial latency) and counters for
//! asserting on delegation behavior.
//!
//! The EC operations use a deterministic stand-in scheme with a
//! channel-side key registry: good enough to exercise the delegation
//! plumbing, shape checks and error paths, with no curve math.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256, Sha512};

use aes_gcm::aead::{Aead, KeyInit, Payload};

use crate::channel::{CallArgs, CallReply, ChannelError, ChannelResult, NativeChannel};

const P256_FIELD: usize = 32;

/// A [`NativeChannel`] living inside the test process
#[derive(Default)]
pub struct TestChannel {
    keys: Mutex<HashMap<u64, Vec<u8>>>,
    ec_registry: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
    next_handle: AtomicU64,
    next_scalar: AtomicU64,
    calls: AtomicUsize,
    imports: AtomicUsize,
    inflight: AtomicUsize,
    max_inflight: AtomicUsize,
    unsupported: Mutex<HashSet<String>>,
    truncate_cipher_text: AtomicBool,
    latency: Mutex<Option<Duration>>,
}

impl TestChannel {
    /// Fresh channel with no faults injected
    pub fn new() -> Self {
        Self::default()
    }

    /// Report every call for `algo` as `UNSUPPORTED_ALGORITHM`
    pub fn force_unsupported(&self, algo: &str) {
        self.unsupported
            .lock()
            .expect("test channel mutex poisoned")
            .insert(algo.to_string());
    }

    /// Truncate encrypt replies by one byte, violating the contract
    pub fn truncate_replies(&self, enabled: bool) {
        self.truncate_cipher_text.store(enabled, Ordering::SeqCst);
    }

    /// Delay every call, simulating a slow process boundary
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().expect("test channel mutex poisoned") = Some(latency);
    }

    /// Total calls processed (including failed ones)
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Key imports processed
    pub fn import_count(&self) -> usize {
        self.imports.load(Ordering::SeqCst)
    }

    /// Peak number of concurrently in-flight calls
    pub fn max_inflight(&self) -> usize {
        self.max_inflight.load(Ordering::SeqCst)
    }

    fn is_unsupported(&self, algo: &str) -> bool {
        self.unsupported
            .lock()
            .expect("test channel mutex poisoned")
            .contains(algo)
    }

    fn resolve_key(&self, args: &CallArgs) -> Result<Vec<u8>, ChannelError> {
        if let Some(handle) = args.get_u64("keyHandle") {
            return self
                .keys
                .lock()
                .expect("test channel mutex poisoned")
                .get(&handle)
                .cloned()
                .ok_or_else(|| ChannelError::Transport("unknown key handle".into()));
        }
        args.get_bytes("key")
            .map(|k| k.to_vec())
            .ok_or_else(|| ChannelError::Transport("missing key argument".into()))
    }

    fn import_key(&self, args: &CallArgs) -> ChannelResult {
        self.imports.fetch_add(1, Ordering::SeqCst);
        let key = args
            .get_bytes("key")
            .ok_or_else(|| ChannelError::Transport("missing key argument".into()))?;
        let handle = self.next_handle.fetch_add(1, Ordering::SeqCst) + 1;
        self.keys
            .lock()
            .expect("test channel mutex poisoned")
            .insert(handle, key.to_vec());
        Ok(CallReply::new().with_u64("handle", handle))
    }

    fn encrypt(&self, args: &CallArgs) -> ChannelResult {
        let algo = args
            .get_str("algo")
            .ok_or_else(|| ChannelError::Transport("missing algo argument".into()))?;
        let key = self.resolve_key(args)?;
        let nonce = args
            .get_bytes("nonce")
            .ok_or_else(|| ChannelError::Transport("missing nonce argument".into()))?;
        let data = args.get_bytes("data").unwrap_or_default();
        let aad = args.get_bytes("aad").unwrap_or_default();

        let combined = seal(algo, &key, nonce, data, aad)?;
        let split = combined.len() - 16;
        let (cipher_text, mac) = combined.split_at(split);

        let mut cipher_text = cipher_text.to_vec();
        if self.truncate_cipher_text.load(Ordering::SeqCst) && !cipher_text.is_empty() {
            cipher_text.pop();
        }
        Ok(CallReply::new()
            .with_bytes("cipherText", cipher_text)
            .with_bytes("mac", mac.to_vec()))
    }

    fn decrypt(&self, args: &CallArgs) -> ChannelResult {
        let algo = args
            .get_str("algo")
            .ok_or_else(|| ChannelError::Transport("missing algo argument".into()))?;
        let key = self.resolve_key(args)?;
        let nonce = args
            .get_bytes("nonce")
            .ok_or_else(|| ChannelError::Transport("missing nonce argument".into()))?;
        let data = args.get_bytes("data").unwrap_or_default();
        let mac = args.get_bytes("mac").unwrap_or_default();
        let aad = args.get_bytes("aad").unwrap_or_default();

        let mut combined = Vec::with_capacity(data.len() + mac.len());
        combined.extend_from_slice(data);
        combined.extend_from_slice(mac);
        let clear_text = open(algo, &key, nonce, &combined, aad)?;
        Ok(CallReply::new().with_bytes("clearText", clear_text))
    }

    fn new_ec_key_pair(&self, args: &CallArgs) -> ChannelResult {
        require_p256(args)?;
        // Deterministic stand-in material; registered so that both sides
        // of a later agreement resolve consistently.
        let counter = self.next_scalar.fetch_add(1, Ordering::SeqCst) + 1;
        let d = digest32(&[b"d", &counter.to_be_bytes()[..]]);
        let x = digest32(&[b"x", &d]);
        let y = digest32(&[b"y", &d]);
        let mut point = x.to_vec();
        point.extend_from_slice(&y);
        self.ec_registry
            .lock()
            .expect("test channel mutex poisoned")
            .insert(point, d.to_vec());
        Ok(CallReply::new()
            .with_bytes("d", d.to_vec())
            .with_bytes("x", x.to_vec())
            .with_bytes("y", y.to_vec()))
    }

    fn ecdsa_sign(&self, args: &CallArgs) -> ChannelResult {
        require_p256(args)?;
        let data = args.get_bytes("data").unwrap_or_default();
        let x = args
            .get_bytes("x")
            .ok_or_else(|| ChannelError::Transport("missing x argument".into()))?;
        let y = args
            .get_bytes("y")
            .ok_or_else(|| ChannelError::Transport("missing y argument".into()))?;
        Ok(CallReply::new().with_bytes("signature", stand_in_signature(x, y, data)))
    }

    fn ecdsa_verify(&self, args: &CallArgs) -> ChannelResult {
        require_p256(args)?;
        let data = args.get_bytes("data").unwrap_or_default();
        let signature = args.get_bytes("signature").unwrap_or_default();
        let x = args
            .get_bytes("x")
            .ok_or_else(|| ChannelError::Transport("missing x argument".into()))?;
        let y = args
            .get_bytes("y")
            .ok_or_else(|| ChannelError::Transport("missing y argument".into()))?;
        let ok = stand_in_signature(x, y, data) == signature;
        Ok(CallReply::new().with_bool("ok", ok))
    }

    fn ecdh_shared_secret(&self, args: &CallArgs) -> ChannelResult {
        require_p256(args)?;
        let local_d = args
            .get_bytes("localD")
            .ok_or_else(|| ChannelError::Transport("missing localD argument".into()))?;
        let remote_x = args
            .get_bytes("remoteX")
            .ok_or_else(|| ChannelError::Transport("missing remoteX argument".into()))?;
        let remote_y = args
            .get_bytes("remoteY")
            .ok_or_else(|| ChannelError::Transport("missing remoteY argument".into()))?;
        let mut point = remote_x.to_vec();
        point.extend_from_slice(remote_y);
        let remote_d = self
            .ec_registry
            .lock()
            .expect("test channel mutex poisoned")
            .get(&point)
            .cloned()
            .ok_or_else(|| ChannelError::Transport("unknown remote key".into()))?;
        // Symmetric in the two scalars, so both parties agree.
        let (lo, hi) = if local_d <= &remote_d[..] {
            (local_d, &remote_d[..])
        } else {
            (&remote_d[..], local_d)
        };
        let shared = digest32(&[b"ecdh", lo, hi]);
        Ok(CallReply::new().with_bytes("bytes", shared.to_vec()))
    }
}

fn digest32(parts: &[&[u8]]) -> [u8; P256_FIELD] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

fn stand_in_signature(x: &[u8], y: &[u8], data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha512::new();
    hasher.update(x);
    hasher.update(y);
    hasher.update(data);
    hasher.finalize().to_vec()
}

fn require_p256(args: &CallArgs) -> Result<(), ChannelError> {
    match args.get_str("curve") {
        Some("p256") => Ok(()),
        Some(other) => Err(ChannelError::UnsupportedAlgorithm(format!(
            "curve {} is not available",
            other
        ))),
        None => Err(ChannelError::Transport("missing curve argument".into())),
    }
}

fn seal(
    algo: &str,
    key: &[u8],
    nonce: &[u8],
    data: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, ChannelError> {
    let payload = Payload { msg: data, aad };
    let rejected = |_| ChannelError::Transport("key rejected".into());
    let failed = |_| ChannelError::Transport("encryption failed".into());
    match (algo, key.len()) {
        ("CHACHA20_POLY1305_AEAD", 32) => chacha20poly1305::ChaCha20Poly1305::new_from_slice(key)
            .map_err(rejected)?
            .encrypt(chacha20poly1305::Nonce::from_slice(nonce), payload)
            .map_err(failed),
        ("AES_GCM", 16) => aes_gcm::Aes128Gcm::new_from_slice(key)
            .map_err(rejected)?
            .encrypt(aes_gcm::Nonce::from_slice(nonce), payload)
            .map_err(failed),
        ("AES_GCM", 32) => aes_gcm::Aes256Gcm::new_from_slice(key)
            .map_err(rejected)?
            .encrypt(aes_gcm::Nonce::from_slice(nonce), payload)
            .map_err(failed),
        _ => Err(ChannelError::UnsupportedAlgorithm(format!(
            "{} is not available here",
            algo
        ))),
    }
}

fn open(
    algo: &str,
    key: &[u8],
    nonce: &[u8],
    combined: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, ChannelError> {
    let payload = Payload { msg: combined, aad };
    let rejected = |_| ChannelError::Transport("key rejected".into());
    let bad_mac = |_| ChannelError::IncorrectMac("tag verification failed".into());
    match (algo, key.len()) {
        ("CHACHA20_POLY1305_AEAD", 32) => chacha20poly1305::ChaCha20Poly1305::new_from_slice(key)
            .map_err(rejected)?
            .decrypt(chacha20poly1305::Nonce::from_slice(nonce), payload)
            .map_err(bad_mac),
        ("AES_GCM", 16) => aes_gcm::Aes128Gcm::new_from_slice(key)
            .map_err(rejected)?
            .decrypt(aes_gcm::Nonce::from_slice(nonce), payload)
            .map_err(bad_mac),
        ("AES_GCM", 32) => aes_gcm::Aes256Gcm::new_from_slice(key)
            .map_err(rejected)?
            .decrypt(aes_gcm::Nonce::from_slice(nonce), payload)
            .map_err(bad_mac),
        _ => Err(ChannelError::UnsupportedAlgorithm(format!(
            "{} is not available here",
            algo
        ))),
    }
}

impl std::fmt::Debug for TestChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestChannel")
            .field("calls", &self.call_count())
            .field("imports", &self.import_count())
            .finish()
    }
}

#[async_trait]
impl NativeChannel for TestChannel {
    async fn call(&self, operation: &str, args: CallArgs) -> ChannelResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let inflight = self.inflight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_inflight.fetch_max(inflight, Ordering::SeqCst);

        let latency = *self.latency.lock().expect("test channel mutex poisoned");
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let result = (|| {
            if let Some(algo) = args.get_str("algo") {
                if self.is_unsupported(algo) {
                    return Err(ChannelError::UnsupportedAlgorithm(format!(
                        "{} is disabled",
                        algo
                    )));
                }
            }
            match operation {
                "importKey" => self.import_key(&args),
                "encrypt" => self.encrypt(&args),
                "decrypt" => self.decrypt(&args),
                "Ecdsa.newKeyPair" | "Ecdh.newKeyPair" => self.new_ec_key_pair(&args),
                "Ecdsa.sign" => self.ecdsa_sign(&args),
                "Ecdsa.verify" => self.ecdsa_verify(&args),
                "Ecdh.sharedSecretKey" => self.ecdh_shared_secret(&args),
                other => Err(ChannelError::Transport(format!(
                    "unknown operation {}",
                    other
                ))),
            }
        })();

        self.inflight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
