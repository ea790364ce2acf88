//! X25519 key agreement (RFC 7748)

use async_trait::async_trait;
use rand::rngs::OsRng;
use x25519_dalek::StaticSecret;

use xcrypt_api::error::{Error, Result};
use xcrypt_api::{
    KeyExchangeAlgorithm, KeyPair, PrivateMaterial, PublicKey, RawKeyKind, SecretBytes, SecretKey,
};

/// Size of an X25519 scalar and point in bytes
pub const X25519_KEY_SIZE: usize = 32;

/// X25519 key agreement algorithm
#[derive(Clone, Copy, Debug, Default)]
pub struct X25519;

impl X25519 {
    /// Create the algorithm
    pub fn new() -> Self {
        Self
    }

    fn scalar(key_pair: &KeyPair) -> Result<StaticSecret> {
        match key_pair.material() {
            PrivateMaterial::Raw {
                kind: RawKeyKind::X25519,
                private,
            } => {
                let scalar: [u8; X25519_KEY_SIZE] =
                    private.as_ref().try_into().map_err(|_| Error::InvalidLength {
                        context: "X25519 private key",
                        expected: X25519_KEY_SIZE,
                        actual: private.len(),
                    })?;
                Ok(StaticSecret::from(scalar))
            }
            _ => Err(Error::param("key_pair", "not an X25519 key pair")),
        }
    }
}

fn derive_public(private: &SecretBytes) -> Result<PublicKey> {
    let scalar: [u8; X25519_KEY_SIZE] =
        private
            .as_ref()
            .try_into()
            .map_err(|_| Error::InvalidLength {
                context: "X25519 private key",
                expected: X25519_KEY_SIZE,
                actual: private.len(),
            })?;
    let secret = StaticSecret::from(scalar);
    Ok(PublicKey::Raw {
        kind: RawKeyKind::X25519,
        bytes: x25519_dalek::PublicKey::from(&secret).as_bytes().to_vec(),
    })
}

#[async_trait]
impl KeyExchangeAlgorithm for X25519 {
    fn name(&self) -> &str {
        "X25519"
    }

    async fn new_key_pair(&self) -> Result<KeyPair> {
        let secret = StaticSecret::random_from_rng(OsRng);
        Ok(KeyPair::raw(
            RawKeyKind::X25519,
            SecretBytes::new(secret.to_bytes().to_vec()),
            derive_public,
        ))
    }

    async fn shared_secret_key(
        &self,
        key_pair: &KeyPair,
        remote_public_key: &PublicKey,
    ) -> Result<SecretKey> {
        let secret = Self::scalar(key_pair)?;
        let remote = match remote_public_key {
            PublicKey::Raw {
                kind: RawKeyKind::X25519,
                bytes,
            } => {
                let point: [u8; X25519_KEY_SIZE] =
                    bytes.as_slice().try_into().map_err(|_| Error::InvalidLength {
                        context: "X25519 public key",
                        expected: X25519_KEY_SIZE,
                        actual: bytes.len(),
                    })?;
                x25519_dalek::PublicKey::from(point)
            }
            _ => return Err(Error::param("remote_public_key", "not an X25519 public key")),
        };
        let shared = secret.diffie_hellman(&remote);
        Ok(SecretKey::new(shared.as_bytes().to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn both_sides_derive_the_same_secret() {
        let algorithm = X25519::new();
        let alice = algorithm.new_key_pair().await.unwrap();
        let bob = algorithm.new_key_pair().await.unwrap();

        let alice_shared = algorithm
            .shared_secret_key(&alice, bob.public_key().await.unwrap())
            .await
            .unwrap();
        let bob_shared = algorithm
            .shared_secret_key(&bob, alice.public_key().await.unwrap())
            .await
            .unwrap();
        assert!(alice_shared.constant_time_eq(&bob_shared).unwrap());
    }

    #[tokio::test]
    async fn rfc7748_test_vector() {
        // RFC 7748 section 6.1.
        let alice_private =
            hex::decode("77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a")
                .unwrap();
        let bob_public = PublicKey::Raw {
            kind: RawKeyKind::X25519,
            bytes: hex::decode("de9edb7d7b7dc1b4d35b61c2ece435373f8343c85b78674dadfc7e146f882b4f")
                .unwrap(),
        };
        let alice = KeyPair::raw(
            RawKeyKind::X25519,
            SecretBytes::new(alice_private),
            derive_public,
        );
        let shared = X25519::new()
            .shared_secret_key(&alice, &bob_public)
            .await
            .unwrap();
        assert_eq!(
            shared.extract().await.unwrap().as_ref(),
            hex::decode("4a5d9d5ba4ce2de1728e3bf480350f25e07e21c947d19e3376f09b3c1e161742")
                .unwrap()
        );
    }

    #[tokio::test]
    async fn rejects_foreign_key_material() {
        let algorithm = X25519::new();
        let pair = algorithm.new_key_pair().await.unwrap();
        let wrong = PublicKey::Raw {
            kind: RawKeyKind::Ed25519,
            bytes: vec![0u8; 32],
        };
        assert!(algorithm.shared_secret_key(&pair, &wrong).await.is_err());
    }
}
