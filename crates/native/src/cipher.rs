//! Delegating cipher
//!
//! Wraps exactly one pure fallback implementation of the same contract
//! and decides per call whether to route to the native backend. A call
//! is delegated only when the platform supports the family and the
//! payload length falls inside the policy window; everything else goes
//! to the fallback unconditionally. A backend reporting an unsupported
//! algorithm falls back transparently. After a delegated call returns,
//! the result shape is checked against the contract; a mismatch is a
//! binding defect and panics rather than being silently tolerated.

use core::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use xcrypt_api::error::{validate, Error, Result};
use xcrypt_api::{Cipher, Mac, NativeHandle, Nonce, SecretBox, SecretBytes, SecretKey};

use crate::channel::{handle_from_reply, CallArgs, ChannelError};
use crate::context::NativeContext;
use crate::platform::AlgorithmFamily;
use crate::policy::ChannelPolicy;
use crate::queue::payload_weight;

/// Failure modes of a native attempt, before fallback resolution
pub(crate) enum NativeFail {
    /// Backend lacks the algorithm; resolve through the fallback
    Unsupported,
    /// Surfaced to the caller as-is
    Error(Error),
}

pub(crate) fn surface(error: ChannelError, algorithm: &'static str) -> NativeFail {
    match error {
        ChannelError::UnsupportedAlgorithm(_) => NativeFail::Unsupported,
        ChannelError::IncorrectMac(_) => NativeFail::Error(Error::Authentication { algorithm }),
        ChannelError::IncorrectPadding(_) => NativeFail::Error(Error::Padding { algorithm }),
        ChannelError::Transport(message) => {
            NativeFail::Error(Error::other("native channel", message))
        }
    }
}

/// Import key material once per key instance, caching the issued handle
///
/// Concurrent imports are harmless (idempotent, last-write-wins). A
/// backend without key import degrades to raw key bytes per call.
pub(crate) async fn native_key(
    context: &NativeContext,
    family: AlgorithmFamily,
    key: &SecretKey,
    key_bytes: &SecretBytes,
) -> std::result::Result<Option<NativeHandle>, ChannelError> {
    let token = family.wire_id();
    if let Some(handle) = key.native_handle(token) {
        return Ok(Some(handle));
    }
    let args = CallArgs::new()
        .str("algo", token)
        .bytes("key", key_bytes.as_ref());
    match context.channel.call("importKey", args).await {
        Ok(reply) => {
            let handle = handle_from_reply(&reply, "importKey");
            key.cache_native_handle(token, handle);
            Ok(Some(handle))
        }
        Err(ChannelError::UnsupportedAlgorithm(_)) => Ok(None),
        Err(other) => Err(other),
    }
}

/// A cipher that routes calls to a native backend when safe and
/// beneficial, and to its pure fallback otherwise
pub struct DelegatingCipher {
    family: AlgorithmFamily,
    fallback: Arc<dyn Cipher>,
    context: NativeContext,
    policy: ChannelPolicy,
}

impl DelegatingCipher {
    /// Wrap a fallback with the default size policy
    pub fn new(family: AlgorithmFamily, fallback: Arc<dyn Cipher>, context: NativeContext) -> Self {
        Self::with_policy(family, fallback, context, ChannelPolicy::DEFAULT)
    }

    /// Wrap a fallback with an explicit size policy
    pub fn with_policy(
        family: AlgorithmFamily,
        fallback: Arc<dyn Cipher>,
        context: NativeContext,
        policy: ChannelPolicy,
    ) -> Self {
        Self {
            family,
            fallback,
            context,
            policy,
        }
    }

    /// The wrapped pure implementation
    pub fn fallback(&self) -> &Arc<dyn Cipher> {
        &self.fallback
    }

    fn routes_natively(&self, payload_length: usize) -> bool {
        self.context.support.supports(self.family) && self.policy.admits(payload_length)
    }

    fn check_args(&self, nonce: &Nonce, aad: &[u8], key: &SecretKey) -> Result<()> {
        validate::length("nonce", nonce.len(), self.fallback.nonce_length())?;
        validate::parameter(
            aad.is_empty() || self.fallback.supports_aad(),
            "aad",
            "cipher does not authenticate extra data",
        )?;
        if let Some(length) = key.length() {
            validate::length("key", length, self.fallback.secret_key_length())?;
        }
        Ok(())
    }

    fn check_encrypt_shape(&self, clear_length: usize, cipher_text: &[u8], mac: &Mac) {
        let expected_ct = self.fallback.cipher_text_length(clear_length);
        let expected_mac = self.fallback.mac_length();
        if cipher_text.len() != expected_ct || mac.len() != expected_mac {
            tracing::error!(
                algorithm = self.family.wire_id(),
                expected_cipher_text = expected_ct,
                actual_cipher_text = cipher_text.len(),
                expected_mac,
                actual_mac = mac.len(),
                "native encrypt result violates the length contract"
            );
            panic!(
                "native backend for {} returned a malformed encrypt result",
                self.family.wire_id()
            );
        }
    }

    fn check_decrypt_shape(&self, clear_text: &[u8], cipher_text_length: usize) {
        if self.fallback.cipher_text_length(clear_text.len()) != cipher_text_length {
            tracing::error!(
                algorithm = self.family.wire_id(),
                clear_text = clear_text.len(),
                cipher_text = cipher_text_length,
                "native decrypt result violates the length contract"
            );
            panic!(
                "native backend for {} returned a malformed decrypt result",
                self.family.wire_id()
            );
        }
    }

    async fn encrypt_native(
        &self,
        clear_text: &[u8],
        key: &SecretKey,
        key_bytes: &SecretBytes,
        nonce: &Nonce,
        aad: &[u8],
    ) -> std::result::Result<SecretBox, NativeFail> {
        let wire_id = self.family.wire_id();
        let weight = payload_weight(&[key_bytes.as_ref(), nonce.as_ref(), clear_text, aad]);
        let _permit = Arc::clone(&self.context.queue).acquire(weight).await;

        let handle = native_key(&self.context, self.family, key, key_bytes)
            .await
            .map_err(|e| surface(e, wire_id))?;

        let mut args = CallArgs::new()
            .str("algo", wire_id)
            .bytes("nonce", nonce.as_ref())
            .bytes("data", clear_text)
            .bytes("aad", aad);
        args = match handle {
            Some(handle) => args.u64("keyHandle", handle.value()),
            None => args.bytes("key", key_bytes.as_ref()),
        };

        let reply = self
            .context
            .channel
            .call("encrypt", args)
            .await
            .map_err(|e| surface(e, wire_id))?;

        let cipher_text = reply.require_bytes("cipherText", "encrypt").to_vec();
        let mac = if self.fallback.mac_length() > 0 {
            Mac::new(reply.require_bytes("mac", "encrypt").to_vec())
        } else {
            Mac::empty()
        };
        self.check_encrypt_shape(clear_text.len(), &cipher_text, &mac);
        Ok(SecretBox::new(nonce.clone(), cipher_text, mac))
    }

    async fn decrypt_native(
        &self,
        secret_box: &SecretBox,
        key: &SecretKey,
        key_bytes: &SecretBytes,
        aad: &[u8],
    ) -> std::result::Result<Vec<u8>, NativeFail> {
        let wire_id = self.family.wire_id();
        let weight = payload_weight(&[
            key_bytes.as_ref(),
            secret_box.nonce().as_ref(),
            secret_box.cipher_text(),
            secret_box.mac().as_ref(),
            aad,
        ]);
        let _permit = Arc::clone(&self.context.queue).acquire(weight).await;

        let handle = native_key(&self.context, self.family, key, key_bytes)
            .await
            .map_err(|e| surface(e, wire_id))?;

        let mut args = CallArgs::new()
            .str("algo", wire_id)
            .bytes("nonce", secret_box.nonce().as_ref())
            .bytes("data", secret_box.cipher_text())
            .bytes("mac", secret_box.mac().as_ref())
            .bytes("aad", aad);
        args = match handle {
            Some(handle) => args.u64("keyHandle", handle.value()),
            None => args.bytes("key", key_bytes.as_ref()),
        };

        let reply = self
            .context
            .channel
            .call("decrypt", args)
            .await
            .map_err(|e| surface(e, wire_id))?;

        let clear_text = reply.require_bytes("clearText", "decrypt").to_vec();
        self.check_decrypt_shape(&clear_text, secret_box.cipher_text().len());
        Ok(clear_text)
    }
}

impl fmt::Debug for DelegatingCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DelegatingCipher({}, fallback={})",
            self.family.wire_id(),
            self.fallback.name()
        )
    }
}

#[async_trait]
impl Cipher for DelegatingCipher {
    fn name(&self) -> &str {
        self.fallback.name()
    }

    fn secret_key_length(&self) -> usize {
        self.fallback.secret_key_length()
    }

    fn nonce_length(&self) -> usize {
        self.fallback.nonce_length()
    }

    fn mac_length(&self) -> usize {
        self.fallback.mac_length()
    }

    fn supports_aad(&self) -> bool {
        self.fallback.supports_aad()
    }

    fn cipher_text_length(&self, clear_text_length: usize) -> usize {
        self.fallback.cipher_text_length(clear_text_length)
    }

    async fn encrypt(
        &self,
        clear_text: &[u8],
        key: &SecretKey,
        nonce: Option<&Nonce>,
        aad: &[u8],
    ) -> Result<SecretBox> {
        let nonce = nonce.cloned().unwrap_or_else(|| self.fallback.new_nonce());
        self.check_args(&nonce, aad, key)?;

        if !self.routes_natively(clear_text.len()) {
            tracing::debug!(
                algorithm = self.family.wire_id(),
                payload = clear_text.len(),
                "encrypt routed to fallback"
            );
            return self.fallback.encrypt(clear_text, key, Some(&nonce), aad).await;
        }

        let key_bytes = key.extract().await?;
        validate::length("key", key_bytes.len(), self.fallback.secret_key_length())?;

        match self
            .encrypt_native(clear_text, key, key_bytes, &nonce, aad)
            .await
        {
            Ok(sealed) => Ok(sealed),
            Err(NativeFail::Unsupported) => {
                tracing::debug!(
                    algorithm = self.family.wire_id(),
                    "backend lacks algorithm; encrypt falling back"
                );
                self.fallback.encrypt(clear_text, key, Some(&nonce), aad).await
            }
            Err(NativeFail::Error(error)) => Err(error),
        }
    }

    async fn decrypt(
        &self,
        secret_box: &SecretBox,
        key: &SecretKey,
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        self.check_args(secret_box.nonce(), aad, key)?;
        validate::length("mac", secret_box.mac().len(), self.fallback.mac_length())?;

        if !self.routes_natively(secret_box.cipher_text().len()) {
            tracing::debug!(
                algorithm = self.family.wire_id(),
                payload = secret_box.cipher_text().len(),
                "decrypt routed to fallback"
            );
            return self.fallback.decrypt(secret_box, key, aad).await;
        }

        let key_bytes = key.extract().await?;
        validate::length("key", key_bytes.len(), self.fallback.secret_key_length())?;

        match self.decrypt_native(secret_box, key, key_bytes, aad).await {
            Ok(clear_text) => Ok(clear_text),
            Err(NativeFail::Unsupported) => {
                tracing::debug!(
                    algorithm = self.family.wire_id(),
                    "backend lacks algorithm; decrypt falling back"
                );
                self.fallback.decrypt(secret_box, key, aad).await
            }
            Err(NativeFail::Error(error)) => Err(error),
        }
    }

    // The synchronous forms are by definition restricted to a non-native
    // execution context: they forward to the fallback unconditionally.

    fn encrypt_sync(
        &self,
        clear_text: &[u8],
        key: &SecretKey,
        nonce: Option<&Nonce>,
        aad: &[u8],
    ) -> Result<SecretBox> {
        self.fallback.encrypt_sync(clear_text, key, nonce, aad)
    }

    fn decrypt_sync(
        &self,
        secret_box: &SecretBox,
        key: &SecretKey,
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        self.fallback.decrypt_sync(secret_box, key, aad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::NativeSupport;
    use crate::queue::AdmissionQueue;
    use crate::testkit::TestChannel;
    use xcrypt_algorithms::{AesGcm, Chacha20Poly1305};

    fn context(support: NativeSupport) -> (Arc<TestChannel>, NativeContext) {
        let channel = Arc::new(TestChannel::new());
        let context = NativeContext::with_support(
            channel.clone(),
            AdmissionQueue::with_default_size(),
            support,
        );
        (channel, context)
    }

    fn delegating_chacha(context: NativeContext) -> DelegatingCipher {
        DelegatingCipher::with_policy(
            AlgorithmFamily::Chacha20Poly1305,
            Arc::new(Chacha20Poly1305::new()),
            context,
            ChannelPolicy::UNBOUNDED,
        )
    }

    #[tokio::test]
    async fn native_and_pure_agree_byte_for_byte() {
        let (channel, context) = context(NativeSupport::ALL);
        let delegating = delegating_chacha(context);
        let pure = Chacha20Poly1305::new();

        let key = delegating.new_secret_key().await.unwrap();
        let nonce = delegating.new_nonce();
        let native = delegating
            .encrypt(b"conformance", &key, Some(&nonce), b"aad")
            .await
            .unwrap();
        let fallback = pure
            .encrypt(b"conformance", &key, Some(&nonce), b"aad")
            .await
            .unwrap();
        assert_eq!(native, fallback);
        assert!(channel.call_count() > 0);

        // Decrypting the natively produced box through the pure path and
        // vice versa both succeed.
        assert_eq!(
            pure.decrypt(&native, &key, b"aad").await.unwrap(),
            b"conformance"
        );
        assert_eq!(
            delegating.decrypt(&fallback, &key, b"aad").await.unwrap(),
            b"conformance"
        );
    }

    #[tokio::test]
    async fn unsupported_platform_is_identical_to_fallback() {
        let (channel, context) = context(NativeSupport::NONE);
        let delegating = delegating_chacha(context);
        let key = delegating.new_secret_key().await.unwrap();
        let nonce = delegating.new_nonce();

        let sealed = delegating
            .encrypt(b"offline", &key, Some(&nonce), &[])
            .await
            .unwrap();
        let pure = Chacha20Poly1305::new()
            .encrypt(b"offline", &key, Some(&nonce), &[])
            .await
            .unwrap();
        assert_eq!(sealed, pure);
        assert_eq!(channel.call_count(), 0);
        assert_eq!(
            delegating.decrypt(&sealed, &key, &[]).await.unwrap(),
            b"offline"
        );
    }

    #[tokio::test]
    async fn payload_outside_policy_window_uses_fallback() {
        let (channel, context) = context(NativeSupport::ALL);
        let delegating = DelegatingCipher::with_policy(
            AlgorithmFamily::Chacha20Poly1305,
            Arc::new(Chacha20Poly1305::new()),
            context,
            ChannelPolicy {
                min_length: 8,
                max_length: 64,
            },
        );
        let key = delegating.new_secret_key().await.unwrap();

        let small = delegating.encrypt(b"tiny", &key, None, &[]).await.unwrap();
        assert_eq!(channel.call_count(), 0);
        let large = delegating
            .encrypt(&[0u8; 100], &key, None, &[])
            .await
            .unwrap();
        assert_eq!(channel.call_count(), 0);
        let inside = delegating
            .encrypt(&[0u8; 32], &key, None, &[])
            .await
            .unwrap();
        assert!(channel.call_count() > 0);

        for sealed in [small, large, inside] {
            assert!(delegating.decrypt(&sealed, &key, &[]).await.is_ok());
        }
    }

    #[tokio::test]
    async fn backend_without_algorithm_falls_back_silently() {
        let (channel, context) = context(NativeSupport::ALL);
        channel.force_unsupported("CHACHA20_POLY1305_AEAD");
        let delegating = delegating_chacha(context);
        let key = delegating.new_secret_key().await.unwrap();

        let sealed = delegating.encrypt(b"quiet", &key, None, &[]).await.unwrap();
        assert_eq!(delegating.decrypt(&sealed, &key, &[]).await.unwrap(), b"quiet");
        // The channel was consulted and refused; the caller never saw it.
        assert!(channel.call_count() > 0);
    }

    #[tokio::test]
    async fn key_import_happens_once_per_key() {
        let (channel, context) = context(NativeSupport::ALL);
        let delegating = delegating_chacha(context);
        let key = delegating.new_secret_key().await.unwrap();

        for _ in 0..5 {
            delegating.encrypt(b"cached", &key, None, &[]).await.unwrap();
        }
        assert_eq!(channel.import_count(), 1);

        let other_key = delegating.new_secret_key().await.unwrap();
        delegating.encrypt(b"new key", &other_key, None, &[]).await.unwrap();
        assert_eq!(channel.import_count(), 2);
    }

    #[tokio::test]
    async fn tampered_box_surfaces_authentication_error() {
        let (_, context) = context(NativeSupport::ALL);
        let delegating = delegating_chacha(context);
        let key = delegating.new_secret_key().await.unwrap();
        let sealed = delegating.encrypt(b"payload", &key, None, &[]).await.unwrap();

        let mut mac = sealed.mac().as_ref().to_vec();
        mac[0] ^= 1;
        let forged = SecretBox::new(
            sealed.nonce().clone(),
            sealed.cipher_text().to_vec(),
            Mac::new(mac),
        );
        assert!(matches!(
            delegating.decrypt(&forged, &key, &[]).await,
            Err(Error::Authentication { .. })
        ));
    }

    #[tokio::test]
    #[should_panic(expected = "malformed encrypt result")]
    async fn truncated_native_reply_is_fatal() {
        let (channel, context) = context(NativeSupport::ALL);
        channel.truncate_replies(true);
        let delegating = DelegatingCipher::with_policy(
            AlgorithmFamily::AesGcm,
            Arc::new(AesGcm::aes256()),
            context,
            ChannelPolicy::UNBOUNDED,
        );
        let key = delegating.new_secret_key().await.unwrap();
        let _ = delegating.encrypt(b"doomed", &key, None, &[]).await;
    }

    #[tokio::test]
    async fn sync_forms_route_to_fallback() {
        let (channel, context) = context(NativeSupport::ALL);
        let delegating = delegating_chacha(context);
        let key = delegating.new_secret_key().await.unwrap();
        let sealed = delegating.encrypt_sync(b"sync path", &key, None, &[]).unwrap();
        assert_eq!(channel.call_count(), 0);
        assert_eq!(
            delegating.decrypt_sync(&sealed, &key, &[]).unwrap(),
            b"sync path"
        );
    }
}
