//! Cipher contracts
//!
//! Every cipher exposes a suspending form (usable over any backend,
//! including native channels and deferred key material) and an immediate
//! synchronous form. The synchronous form is only available where the
//! backend is guaranteed non-suspending: the default implementation fails
//! with an unsupported-operation error, pure implementations override it,
//! and delegating implementations route it to their fallback.

use core::fmt;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::{Mac, Nonce, SecretBox, SecretKey};

/// Contract for symmetric ciphers
#[async_trait]
pub trait Cipher: Send + Sync + fmt::Debug {
    /// Human-readable algorithm name
    fn name(&self) -> &str;

    /// Required secret key length in bytes
    fn secret_key_length(&self) -> usize;

    /// Required nonce length in bytes
    fn nonce_length(&self) -> usize;

    /// Length of the authentication tag; 0 for unauthenticated ciphers
    fn mac_length(&self) -> usize {
        0
    }

    /// Whether associated data is authenticated by this cipher
    fn supports_aad(&self) -> bool {
        false
    }

    /// Whether this cipher authenticates its output
    fn is_authenticated(&self) -> bool {
        self.mac_length() > 0
    }

    /// Cipher text length as a pure function of clear text length
    ///
    /// Identity for stream ciphers; rounded up to the block size plus
    /// padding for block ciphers.
    fn cipher_text_length(&self, clear_text_length: usize) -> usize;

    /// Generate a new random secret key for this cipher
    async fn new_secret_key(&self) -> Result<SecretKey> {
        Ok(SecretKey::random(self.secret_key_length()))
    }

    /// Generate a fresh random nonce of the right length
    fn new_nonce(&self) -> Nonce {
        Nonce::random(self.nonce_length())
    }

    /// Encrypt, generating a fresh nonce when none is supplied
    async fn encrypt(
        &self,
        clear_text: &[u8],
        key: &SecretKey,
        nonce: Option<&Nonce>,
        aad: &[u8],
    ) -> Result<SecretBox>;

    /// Authenticate (where applicable) and decrypt
    async fn decrypt(&self, secret_box: &SecretBox, key: &SecretKey, aad: &[u8])
        -> Result<Vec<u8>>;

    /// Immediate form of [`Cipher::encrypt`]
    fn encrypt_sync(
        &self,
        _clear_text: &[u8],
        _key: &SecretKey,
        _nonce: Option<&Nonce>,
        _aad: &[u8],
    ) -> Result<SecretBox> {
        Err(Error::Unsupported {
            operation: "synchronous encrypt",
        })
    }

    /// Immediate form of [`Cipher::decrypt`]
    fn decrypt_sync(
        &self,
        _secret_box: &SecretBox,
        _key: &SecretKey,
        _aad: &[u8],
    ) -> Result<Vec<u8>> {
        Err(Error::Unsupported {
            operation: "synchronous decrypt",
        })
    }
}

/// Contract for ciphers whose keystream is seekable
///
/// Encrypting starting at offset `k` for length `n` must be byte-identical
/// to encrypting the full message from offset 0 and slicing out
/// `[k, k + n)`. This is a hard correctness property relied upon by
/// random-access decryption, not an optimization detail.
#[async_trait]
pub trait KeystreamCipher: Cipher {
    /// Encrypt starting at the given keystream byte offset
    async fn encrypt_with_offset(
        &self,
        clear_text: &[u8],
        key: &SecretKey,
        nonce: Option<&Nonce>,
        aad: &[u8],
        key_stream_index: u64,
    ) -> Result<SecretBox>;

    /// Decrypt starting at the given keystream byte offset
    async fn decrypt_with_offset(
        &self,
        secret_box: &SecretBox,
        key: &SecretKey,
        aad: &[u8],
        key_stream_index: u64,
    ) -> Result<Vec<u8>>;
}

/// Incremental encryption: accepts clear text chunks, emits cipher text
///
/// Single-pass and not restartable. The authentication tag only exists
/// once the last chunk has been processed; [`EncryptorSink::finish`]
/// consumes the sink, which makes the tag delivery exactly-once by
/// construction.
pub trait EncryptorSink: Send {
    /// Transform one chunk, returning the cipher text produced by it
    fn add(&mut self, chunk: &[u8]) -> Result<Vec<u8>>;

    /// Transform `chunk[start..end]`; `is_last` closes the sink for input
    fn add_slice(
        &mut self,
        chunk: &[u8],
        start: usize,
        end: usize,
        is_last: bool,
    ) -> Result<Vec<u8>>;

    /// Complete the stream: any trailing cipher text plus the tag
    fn finish(self: Box<Self>) -> Result<(Vec<u8>, Mac)>;
}

/// Incremental decryption: accepts cipher text chunks, emits clear text
///
/// Output handed out by [`DecryptorSink::add`] is *unauthenticated* until
/// [`DecryptorSink::finish`] verifies the tag; callers must not release
/// it downstream before that.
pub trait DecryptorSink: Send {
    /// Transform one chunk, returning the clear text produced by it
    fn add(&mut self, chunk: &[u8]) -> Result<Vec<u8>>;

    /// Transform `chunk[start..end]`; `is_last` closes the sink for input
    fn add_slice(
        &mut self,
        chunk: &[u8],
        start: usize,
        end: usize,
        is_last: bool,
    ) -> Result<Vec<u8>>;

    /// Complete the stream, verifying the tag computed over all input
    fn finish(self: Box<Self>, expected: &Mac) -> Result<Vec<u8>>;
}

/// Contract for ciphers supporting chunked, incremental operation
#[async_trait]
pub trait StreamingCipher: Cipher {
    /// Open an incremental encryptor
    async fn encryptor(
        &self,
        key: &SecretKey,
        nonce: &Nonce,
        aad: &[u8],
    ) -> Result<Box<dyn EncryptorSink>>;

    /// Open an incremental decryptor
    async fn decryptor(
        &self,
        key: &SecretKey,
        nonce: &Nonce,
        aad: &[u8],
    ) -> Result<Box<dyn DecryptorSink>>;
}
