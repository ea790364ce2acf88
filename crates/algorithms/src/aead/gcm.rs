//! AES-GCM AEAD
//!
//! The canonical natively-accelerated cipher: every major platform
//! backend (Web Crypto, CryptoKit, Android keystore) implements it. The
//! tag is carried out-of-band in the envelope, not appended to the
//! cipher text.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use async_trait::async_trait;

use xcrypt_api::error::{validate, Error, Result};
use xcrypt_api::{Cipher, Mac, Nonce, SecretBox, SecretBytes, SecretKey};

/// Size of the AES-GCM nonce in bytes
pub const AES_GCM_NONCE_SIZE: usize = 12;
/// Size of the AES-GCM tag in bytes
pub const AES_GCM_TAG_SIZE: usize = 16;

/// AES in Galois/Counter mode
#[derive(Clone, Copy, Debug)]
pub struct AesGcm {
    key_length: usize,
}

impl AesGcm {
    /// AES-128-GCM
    pub fn aes128() -> Self {
        Self { key_length: 16 }
    }

    /// AES-256-GCM
    pub fn aes256() -> Self {
        Self { key_length: 32 }
    }

    fn check_args(&self, nonce: &Nonce) -> Result<()> {
        validate::length("AES-GCM nonce", nonce.len(), AES_GCM_NONCE_SIZE)
    }

    fn seal(
        &self,
        clear_text: &[u8],
        key: &SecretBytes,
        nonce: &Nonce,
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        validate::length("AES-GCM key", key.len(), self.key_length)?;
        let payload = Payload {
            msg: clear_text,
            aad,
        };
        let nonce = aes_gcm::Nonce::from_slice(nonce.as_ref());
        let sealed = match key.len() {
            16 => aes_gcm::Aes128Gcm::new_from_slice(key.as_ref())
                .map_err(|_| Error::param("AES-GCM key", "rejected by cipher core"))?
                .encrypt(nonce, payload),
            _ => aes_gcm::Aes256Gcm::new_from_slice(key.as_ref())
                .map_err(|_| Error::param("AES-GCM key", "rejected by cipher core"))?
                .encrypt(nonce, payload),
        };
        sealed.map_err(|_| Error::other("AES-GCM", "encryption failed"))
    }

    fn open(
        &self,
        combined: &[u8],
        key: &SecretBytes,
        nonce: &Nonce,
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        validate::length("AES-GCM key", key.len(), self.key_length)?;
        let payload = Payload { msg: combined, aad };
        let nonce = aes_gcm::Nonce::from_slice(nonce.as_ref());
        let opened = match key.len() {
            16 => aes_gcm::Aes128Gcm::new_from_slice(key.as_ref())
                .map_err(|_| Error::param("AES-GCM key", "rejected by cipher core"))?
                .decrypt(nonce, payload),
            _ => aes_gcm::Aes256Gcm::new_from_slice(key.as_ref())
                .map_err(|_| Error::param("AES-GCM key", "rejected by cipher core"))?
                .decrypt(nonce, payload),
        };
        opened.map_err(|_| Error::Authentication {
            algorithm: "AES-GCM",
        })
    }

    fn encrypt_core(
        &self,
        clear_text: &[u8],
        key: &SecretBytes,
        nonce: Nonce,
        aad: &[u8],
    ) -> Result<SecretBox> {
        let mut combined = self.seal(clear_text, key, &nonce, aad)?;
        let mac = Mac::new(combined.split_off(combined.len() - AES_GCM_TAG_SIZE));
        Ok(SecretBox::new(nonce, combined, mac))
    }

    fn decrypt_core(
        &self,
        secret_box: &SecretBox,
        key: &SecretBytes,
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        let mut combined =
            Vec::with_capacity(secret_box.cipher_text().len() + AES_GCM_TAG_SIZE);
        combined.extend_from_slice(secret_box.cipher_text());
        combined.extend_from_slice(secret_box.mac().as_ref());
        self.open(&combined, key, secret_box.nonce(), aad)
    }
}

#[async_trait]
impl Cipher for AesGcm {
    fn name(&self) -> &str {
        match self.key_length {
            16 => "AES-128-GCM",
            _ => "AES-256-GCM",
        }
    }

    fn secret_key_length(&self) -> usize {
        self.key_length
    }

    fn nonce_length(&self) -> usize {
        AES_GCM_NONCE_SIZE
    }

    fn mac_length(&self) -> usize {
        AES_GCM_TAG_SIZE
    }

    fn supports_aad(&self) -> bool {
        true
    }

    fn cipher_text_length(&self, clear_text_length: usize) -> usize {
        clear_text_length
    }

    async fn encrypt(
        &self,
        clear_text: &[u8],
        key: &SecretKey,
        nonce: Option<&Nonce>,
        aad: &[u8],
    ) -> Result<SecretBox> {
        let nonce = nonce.cloned().unwrap_or_else(|| self.new_nonce());
        self.check_args(&nonce)?;
        let key = key.extract().await?;
        self.encrypt_core(clear_text, key, nonce, aad)
    }

    async fn decrypt(
        &self,
        secret_box: &SecretBox,
        key: &SecretKey,
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        self.check_args(secret_box.nonce())?;
        validate::length("AES-GCM mac", secret_box.mac().len(), AES_GCM_TAG_SIZE)?;
        let key = key.extract().await?;
        self.decrypt_core(secret_box, key, aad)
    }

    fn encrypt_sync(
        &self,
        clear_text: &[u8],
        key: &SecretKey,
        nonce: Option<&Nonce>,
        aad: &[u8],
    ) -> Result<SecretBox> {
        let nonce = nonce.cloned().unwrap_or_else(|| self.new_nonce());
        self.check_args(&nonce)?;
        self.encrypt_core(clear_text, key.extract_sync()?, nonce, aad)
    }

    fn decrypt_sync(
        &self,
        secret_box: &SecretBox,
        key: &SecretKey,
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        self.check_args(secret_box.nonce())?;
        validate::length("AES-GCM mac", secret_box.mac().len(), AES_GCM_TAG_SIZE)?;
        self.decrypt_core(secret_box, key.extract_sync()?, aad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn nist_vector_aes256() {
        // NIST GCM test vector: 256-bit zero key, zero nonce, empty plaintext.
        let key = SecretKey::new(vec![0u8; 32]);
        let nonce = Nonce::new(vec![0u8; 12]);
        let sealed = AesGcm::aes256()
            .encrypt(&[], &key, Some(&nonce), &[])
            .await
            .unwrap();
        assert!(sealed.cipher_text().is_empty());
        assert_eq!(
            sealed.mac().as_ref(),
            hex::decode("530f8afbc74536b9a963b4f1c4cb738b").unwrap()
        );
    }

    #[tokio::test]
    async fn round_trip_with_aad() {
        let cipher = AesGcm::aes128();
        let key = cipher.new_secret_key().await.unwrap();
        for len in [0usize, 1, 15, 16, 17, 100] {
            let clear = vec![0x77u8; len];
            let sealed = cipher.encrypt(&clear, &key, None, b"header").await.unwrap();
            assert_eq!(sealed.cipher_text().len(), cipher.cipher_text_length(len));
            assert_eq!(
                cipher.decrypt(&sealed, &key, b"header").await.unwrap(),
                clear
            );
            assert!(cipher.decrypt(&sealed, &key, b"tampered").await.is_err());
        }
    }

    #[tokio::test]
    async fn tampered_mac_is_rejected() {
        let cipher = AesGcm::aes256();
        let key = cipher.new_secret_key().await.unwrap();
        let sealed = cipher.encrypt(b"payload", &key, None, &[]).await.unwrap();
        let mut mac = sealed.mac().as_ref().to_vec();
        mac[0] ^= 1;
        let forged = SecretBox::new(
            sealed.nonce().clone(),
            sealed.cipher_text().to_vec(),
            Mac::new(mac),
        );
        assert!(matches!(
            cipher.decrypt(&forged, &key, &[]).await,
            Err(Error::Authentication { .. })
        ));
    }
}
