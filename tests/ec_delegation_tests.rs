//! Delegated ECDSA/ECDH plumbing
//!
//! These exercise the native-only delegation paths: key pairs and
//! results flow through the wire contract, and with no fallback
//! configured, missing platform support surfaces an explicit
//! unsupported failure.

use std::sync::Arc;

use xcrypt::api::Error;
use xcrypt::native::testkit::TestChannel;
use xcrypt::native::{DelegatingKeyExchange, DelegatingSignature};
use xcrypt::prelude::*;

fn context(support: NativeSupport) -> NativeContext {
    NativeContext::with_support(
        Arc::new(TestChannel::new()),
        AdmissionQueue::with_default_size(),
        support,
    )
}

#[tokio::test]
async fn ecdsa_sign_verify_round_trip() {
    let ecdsa = DelegatingSignature::new(EcCurve::P256, context(NativeSupport::ALL));
    let pair = ecdsa.new_key_pair().await.unwrap();

    let signature = ecdsa.sign(b"delegated message", &pair).await.unwrap();
    assert_eq!(signature.bytes().len(), 64);
    match signature.public_key() {
        PublicKey::Ec { curve, x, y } => {
            assert_eq!(*curve, EcCurve::P256);
            assert_eq!(x.len(), 32);
            assert_eq!(y.len(), 32);
        }
        other => panic!("unexpected public key {:?}", other),
    }

    assert!(ecdsa.verify(b"delegated message", &signature).await.unwrap());
    assert!(!ecdsa.verify(b"another message", &signature).await.unwrap());
}

#[tokio::test]
async fn ecdh_both_sides_agree() {
    let shared_context = context(NativeSupport::ALL);
    let ecdh = DelegatingKeyExchange::new(EcCurve::P256, shared_context);

    let alice = ecdh.new_key_pair().await.unwrap();
    let bob = ecdh.new_key_pair().await.unwrap();

    let alice_secret = ecdh
        .shared_secret_key(&alice, bob.public_key().await.unwrap())
        .await
        .unwrap();
    let bob_secret = ecdh
        .shared_secret_key(&bob, alice.public_key().await.unwrap())
        .await
        .unwrap();
    assert!(alice_secret.constant_time_eq(&bob_secret).unwrap());
    assert_eq!(alice_secret.length(), Some(32));
}

#[tokio::test]
async fn no_fallback_means_explicit_unsupported() {
    let ecdsa = DelegatingSignature::new(EcCurve::P256, context(NativeSupport::NONE));
    assert!(matches!(
        ecdsa.new_key_pair().await,
        Err(Error::Unsupported { .. })
    ));

    let ecdh = DelegatingKeyExchange::new(EcCurve::P256, context(NativeSupport::NONE));
    assert!(matches!(
        ecdh.new_key_pair().await,
        Err(Error::Unsupported { .. })
    ));
}

#[tokio::test]
async fn unsupported_curve_without_fallback_is_explicit() {
    // The test backend only implements p256; p384 must surface the
    // unsupported failure rather than resolving silently.
    let ecdsa = DelegatingSignature::new(EcCurve::P384, context(NativeSupport::ALL));
    assert!(matches!(
        ecdsa.new_key_pair().await,
        Err(Error::Unsupported { .. })
    ));
}

#[tokio::test]
async fn foreign_key_pair_is_rejected_eagerly() {
    let ecdsa = DelegatingSignature::new(EcCurve::P256, context(NativeSupport::ALL));
    let ecdh = DelegatingKeyExchange::new(EcCurve::P256, context(NativeSupport::ALL));
    let x25519 = xcrypt::algorithms::X25519::new();
    let pair = x25519.new_key_pair().await.unwrap();

    assert!(matches!(
        ecdsa.sign(b"msg", &pair).await,
        Err(Error::InvalidParameter { .. })
    ));
    let remote = pair.public_key().await.unwrap().clone();
    assert!(matches!(
        ecdh.shared_secret_key(&pair, &remote).await,
        Err(Error::InvalidParameter { .. })
    ));
}
