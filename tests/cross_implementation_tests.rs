//! Cross-implementation conformance
//!
//! A platform-accelerated cipher and its pure fallback must produce
//! byte-identical output for identical key/nonce/plaintext/AAD, and
//! disabling the platform must be observationally identical to always
//! using the fallback.

use std::sync::Arc;

use xcrypt::algorithms::{AesGcm, Chacha20Poly1305};
use xcrypt::native::testkit::TestChannel;
use xcrypt::prelude::*;

fn delegating(
    family: AlgorithmFamily,
    fallback: Arc<dyn Cipher>,
    support: NativeSupport,
) -> (Arc<TestChannel>, DelegatingCipher) {
    let channel = Arc::new(TestChannel::new());
    let context = NativeContext::with_support(
        channel.clone(),
        AdmissionQueue::with_default_size(),
        support,
    );
    (
        channel.clone(),
        DelegatingCipher::with_policy(family, fallback, context, ChannelPolicy::UNBOUNDED),
    )
}

#[tokio::test]
async fn chacha20poly1305_native_equals_pure() {
    let pure = Chacha20Poly1305::new();
    let (channel, native) = delegating(
        AlgorithmFamily::Chacha20Poly1305,
        Arc::new(Chacha20Poly1305::new()),
        NativeSupport::ALL,
    );

    let key = pure.new_secret_key().await.unwrap();
    for len in [0usize, 1, 63, 64, 65, 1000] {
        let clear: Vec<u8> = (0..len).map(|i| i as u8).collect();
        let nonce = pure.new_nonce();
        let from_native = native
            .encrypt(&clear, &key, Some(&nonce), b"shared aad")
            .await
            .unwrap();
        let from_pure = pure
            .encrypt(&clear, &key, Some(&nonce), b"shared aad")
            .await
            .unwrap();
        assert_eq!(from_native, from_pure, "length {}", len);
        assert_eq!(
            native.decrypt(&from_pure, &key, b"shared aad").await.unwrap(),
            clear
        );
        assert_eq!(
            pure.decrypt(&from_native, &key, b"shared aad").await.unwrap(),
            clear
        );
    }
    assert!(channel.call_count() > 0);
}

#[tokio::test]
async fn aes_gcm_native_equals_pure() {
    let pure = AesGcm::aes256();
    let (_, native) = delegating(
        AlgorithmFamily::AesGcm,
        Arc::new(AesGcm::aes256()),
        NativeSupport::ALL,
    );

    let key = pure.new_secret_key().await.unwrap();
    let nonce = pure.new_nonce();
    let from_native = native
        .encrypt(b"gcm payload", &key, Some(&nonce), &[])
        .await
        .unwrap();
    let from_pure = pure
        .encrypt(b"gcm payload", &key, Some(&nonce), &[])
        .await
        .unwrap();
    assert_eq!(from_native, from_pure);
}

#[tokio::test]
async fn disabled_platform_is_observationally_pure() {
    let (channel, native) = delegating(
        AlgorithmFamily::AesGcm,
        Arc::new(AesGcm::aes128()),
        NativeSupport::NONE,
    );
    let pure = AesGcm::aes128();

    let key = native.new_secret_key().await.unwrap();
    let nonce = native.new_nonce();
    let sealed = native
        .encrypt(b"no platform", &key, Some(&nonce), b"aad")
        .await
        .unwrap();
    assert_eq!(
        sealed,
        pure.encrypt(b"no platform", &key, Some(&nonce), b"aad")
            .await
            .unwrap()
    );
    assert_eq!(
        native.decrypt(&sealed, &key, b"aad").await.unwrap(),
        b"no platform"
    );
    assert_eq!(channel.call_count(), 0);
}

#[tokio::test]
async fn wire_encoding_round_trips_through_both() {
    let pure = Chacha20Poly1305::new();
    let (_, native) = delegating(
        AlgorithmFamily::Chacha20Poly1305,
        Arc::new(Chacha20Poly1305::new()),
        NativeSupport::ALL,
    );
    let key = pure.new_secret_key().await.unwrap();
    let sealed = native.encrypt(b"wire format", &key, None, &[]).await.unwrap();

    // nonce || cipherText || mac
    let wire = sealed.concatenation();
    assert_eq!(
        wire.len(),
        pure.nonce_length() + pure.cipher_text_length(11) + pure.mac_length()
    );
    let parsed =
        SecretBox::from_concatenation(&wire, pure.nonce_length(), pure.mac_length()).unwrap();
    assert_eq!(parsed, sealed);
    assert_eq!(pure.decrypt(&parsed, &key, &[]).await.unwrap(), b"wire format");
}
