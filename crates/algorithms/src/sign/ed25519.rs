//! Ed25519 signatures (RFC 8032)

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use xcrypt_api::error::{Error, Result};
use xcrypt_api::{
    KeyPair, PrivateMaterial, PublicKey, RawKeyKind, SecretBytes, Signature, SignatureAlgorithm,
};

/// Size of an Ed25519 seed/private key in bytes
pub const ED25519_KEY_SIZE: usize = 32;
/// Size of an Ed25519 signature in bytes
pub const ED25519_SIGNATURE_SIZE: usize = 64;

/// Ed25519 signature algorithm
#[derive(Clone, Copy, Debug, Default)]
pub struct Ed25519;

impl Ed25519 {
    /// Create the algorithm
    pub fn new() -> Self {
        Self
    }

    fn signing_key(key_pair: &KeyPair) -> Result<SigningKey> {
        match key_pair.material() {
            PrivateMaterial::Raw {
                kind: RawKeyKind::Ed25519,
                private,
            } => {
                let seed: [u8; ED25519_KEY_SIZE] = private.as_ref().try_into().map_err(|_| {
                    Error::InvalidLength {
                        context: "Ed25519 private key",
                        expected: ED25519_KEY_SIZE,
                        actual: private.len(),
                    }
                })?;
                Ok(SigningKey::from_bytes(&seed))
            }
            _ => Err(Error::param("key_pair", "not an Ed25519 key pair")),
        }
    }
}

/// Derive the public point from a seed; used for lazy public-key access
fn derive_public(private: &SecretBytes) -> Result<PublicKey> {
    let seed: [u8; ED25519_KEY_SIZE] =
        private
            .as_ref()
            .try_into()
            .map_err(|_| Error::InvalidLength {
                context: "Ed25519 private key",
                expected: ED25519_KEY_SIZE,
                actual: private.len(),
            })?;
    let signing = SigningKey::from_bytes(&seed);
    Ok(PublicKey::Raw {
        kind: RawKeyKind::Ed25519,
        bytes: signing.verifying_key().to_bytes().to_vec(),
    })
}

#[async_trait]
impl SignatureAlgorithm for Ed25519 {
    fn name(&self) -> &str {
        "Ed25519"
    }

    fn signature_length(&self) -> usize {
        ED25519_SIGNATURE_SIZE
    }

    async fn new_key_pair(&self) -> Result<KeyPair> {
        let signing = SigningKey::generate(&mut OsRng);
        Ok(KeyPair::raw(
            RawKeyKind::Ed25519,
            SecretBytes::new(signing.to_bytes().to_vec()),
            derive_public,
        ))
    }

    async fn sign(&self, message: &[u8], key_pair: &KeyPair) -> Result<Signature> {
        let signing = Self::signing_key(key_pair)?;
        let signature = signing.sign(message);
        let public_key = key_pair.public_key().await?.clone();
        Ok(Signature::new(signature.to_bytes().to_vec(), public_key))
    }

    async fn verify(&self, message: &[u8], signature: &Signature) -> Result<bool> {
        let public = match signature.public_key() {
            PublicKey::Raw {
                kind: RawKeyKind::Ed25519,
                bytes,
            } => {
                let bytes: [u8; ED25519_KEY_SIZE] =
                    bytes.as_slice().try_into().map_err(|_| Error::InvalidLength {
                        context: "Ed25519 public key",
                        expected: ED25519_KEY_SIZE,
                        actual: bytes.len(),
                    })?;
                VerifyingKey::from_bytes(&bytes)
                    .map_err(|_| Error::param("public_key", "not a valid Ed25519 point"))?
            }
            _ => return Err(Error::param("public_key", "not an Ed25519 public key")),
        };
        let bytes: [u8; ED25519_SIGNATURE_SIZE] =
            signature
                .bytes()
                .try_into()
                .map_err(|_| Error::InvalidLength {
                    context: "Ed25519 signature",
                    expected: ED25519_SIGNATURE_SIZE,
                    actual: signature.bytes().len(),
                })?;
        let signature = ed25519_dalek::Signature::from_bytes(&bytes);
        Ok(public.verify(message, &signature).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_verify_round_trip() {
        let algorithm = Ed25519::new();
        let pair = algorithm.new_key_pair().await.unwrap();
        let signature = algorithm.sign(b"signed message", &pair).await.unwrap();
        assert_eq!(signature.bytes().len(), ED25519_SIGNATURE_SIZE);
        assert!(algorithm.verify(b"signed message", &signature).await.unwrap());
        assert!(!algorithm.verify(b"other message", &signature).await.unwrap());
    }

    #[tokio::test]
    async fn rfc8032_test_vector_1() {
        // RFC 8032 section 7.1, TEST 1: empty message.
        let seed = hex::decode("9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60")
            .unwrap();
        let pair = KeyPair::raw(
            RawKeyKind::Ed25519,
            SecretBytes::new(seed),
            derive_public,
        );
        let algorithm = Ed25519::new();
        let signature = algorithm.sign(&[], &pair).await.unwrap();
        assert_eq!(
            signature.bytes(),
            hex::decode(
                "e5564300c360ac729086e2cc806e828a84877f1eb8e5d974d873e06522490155\
                 5fb8821590a33bacc61e39701cf9b46bd25bf5f0595bbe24655141438e7a100b"
            )
            .unwrap()
        );
        match signature.public_key() {
            PublicKey::Raw { bytes, .. } => assert_eq!(
                bytes,
                &hex::decode("d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a")
                    .unwrap()
            ),
            other => panic!("unexpected public key {:?}", other),
        }
        assert!(algorithm.verify(&[], &signature).await.unwrap());
    }

    #[tokio::test]
    async fn signature_is_self_describing() {
        // Verification uses only the key carried inside the signature.
        let algorithm = Ed25519::new();
        let pair_a = algorithm.new_key_pair().await.unwrap();
        let pair_b = algorithm.new_key_pair().await.unwrap();
        let signature = algorithm.sign(b"msg", &pair_a).await.unwrap();
        let forged = Signature::new(
            signature.bytes().to_vec(),
            pair_b.public_key().await.unwrap().clone(),
        );
        assert!(!algorithm.verify(b"msg", &forged).await.unwrap());
    }
}
