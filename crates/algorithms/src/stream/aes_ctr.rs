//! AES-CTR stream cipher
//!
//! The counter block is the 12-byte nonce followed by a 32-bit big-endian
//! block counter starting at zero, matching the layout used by platform
//! Web Crypto backends. Unauthenticated; compose with a MAC through
//! [`crate::compose`] for integrity.

use async_trait::async_trait;
use ctr::cipher::{KeyIvInit, StreamCipher, StreamCipherSeek};

use xcrypt_api::error::{validate, Error, Result};
use xcrypt_api::{Cipher, KeystreamCipher, Mac, Nonce, SecretBox, SecretBytes, SecretKey};

/// Size of the AES-CTR nonce in bytes
pub const AES_CTR_NONCE_SIZE: usize = 12;
/// Size of an AES block in bytes
pub const AES_BLOCK_SIZE: usize = 16;

type Ctr32Aes128 = ctr::Ctr32BE<aes::Aes128>;
type Ctr32Aes192 = ctr::Ctr32BE<aes::Aes192>;
type Ctr32Aes256 = ctr::Ctr32BE<aes::Aes256>;

/// AES in 32-bit big-endian counter mode
#[derive(Clone, Copy, Debug)]
pub struct AesCtr {
    key_length: usize,
}

impl AesCtr {
    /// AES-128-CTR
    pub fn aes128() -> Self {
        Self { key_length: 16 }
    }

    /// AES-192-CTR
    pub fn aes192() -> Self {
        Self { key_length: 24 }
    }

    /// AES-256-CTR
    pub fn aes256() -> Self {
        Self { key_length: 32 }
    }

    fn apply_keystream(
        &self,
        key: &[u8],
        nonce: &[u8],
        offset: u64,
        data: &mut [u8],
    ) -> Result<()> {
        let mut iv = [0u8; AES_BLOCK_SIZE];
        iv[..AES_CTR_NONCE_SIZE].copy_from_slice(nonce);

        let invalid = |_| Error::param("AES-CTR key", "key/nonce rejected by cipher core");
        match key.len() {
            16 => {
                let mut ctr = Ctr32Aes128::new_from_slices(key, &iv).map_err(invalid)?;
                ctr.seek(offset);
                ctr.apply_keystream(data);
            }
            24 => {
                let mut ctr = Ctr32Aes192::new_from_slices(key, &iv).map_err(invalid)?;
                ctr.seek(offset);
                ctr.apply_keystream(data);
            }
            32 => {
                let mut ctr = Ctr32Aes256::new_from_slices(key, &iv).map_err(invalid)?;
                ctr.seek(offset);
                ctr.apply_keystream(data);
            }
            other => {
                return Err(Error::InvalidLength {
                    context: "AES-CTR key",
                    expected: self.key_length,
                    actual: other,
                })
            }
        }
        Ok(())
    }

    fn check_args(&self, nonce: &Nonce, aad: &[u8]) -> Result<()> {
        validate::length("AES-CTR nonce", nonce.len(), AES_CTR_NONCE_SIZE)?;
        validate::parameter(aad.is_empty(), "aad", "AES-CTR does not authenticate data")
    }

    fn encrypt_core(
        &self,
        clear_text: &[u8],
        key: &SecretBytes,
        nonce: Nonce,
        offset: u64,
    ) -> Result<SecretBox> {
        validate::length("AES-CTR key", key.len(), self.key_length)?;
        let mut out = clear_text.to_vec();
        self.apply_keystream(key.as_ref(), nonce.as_ref(), offset, &mut out)?;
        Ok(SecretBox::new(nonce, out, Mac::empty()))
    }

    fn decrypt_core(
        &self,
        secret_box: &SecretBox,
        key: &SecretBytes,
        offset: u64,
    ) -> Result<Vec<u8>> {
        validate::length("AES-CTR key", key.len(), self.key_length)?;
        let mut out = secret_box.cipher_text().to_vec();
        self.apply_keystream(key.as_ref(), secret_box.nonce().as_ref(), offset, &mut out)?;
        Ok(out)
    }
}

#[async_trait]
impl Cipher for AesCtr {
    fn name(&self) -> &str {
        match self.key_length {
            16 => "AES-128-CTR",
            24 => "AES-192-CTR",
            _ => "AES-256-CTR",
        }
    }

    fn secret_key_length(&self) -> usize {
        self.key_length
    }

    fn nonce_length(&self) -> usize {
        AES_CTR_NONCE_SIZE
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
        self.encrypt_with_offset(clear_text, key, nonce, aad, 0).await
    }

    async fn decrypt(
        &self,
        secret_box: &SecretBox,
        key: &SecretKey,
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        self.decrypt_with_offset(secret_box, key, aad, 0).await
    }

    fn encrypt_sync(
        &self,
        clear_text: &[u8],
        key: &SecretKey,
        nonce: Option<&Nonce>,
        aad: &[u8],
    ) -> Result<SecretBox> {
        let nonce = nonce.cloned().unwrap_or_else(|| self.new_nonce());
        self.check_args(&nonce, aad)?;
        self.encrypt_core(clear_text, key.extract_sync()?, nonce, 0)
    }

    fn decrypt_sync(
        &self,
        secret_box: &SecretBox,
        key: &SecretKey,
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        self.check_args(secret_box.nonce(), aad)?;
        validate::length("AES-CTR mac", secret_box.mac().len(), 0)?;
        self.decrypt_core(secret_box, key.extract_sync()?, 0)
    }
}

#[async_trait]
impl KeystreamCipher for AesCtr {
    async fn encrypt_with_offset(
        &self,
        clear_text: &[u8],
        key: &SecretKey,
        nonce: Option<&Nonce>,
        aad: &[u8],
        key_stream_index: u64,
    ) -> Result<SecretBox> {
        let nonce = nonce.cloned().unwrap_or_else(|| self.new_nonce());
        self.check_args(&nonce, aad)?;
        let key = key.extract().await?;
        self.encrypt_core(clear_text, key, nonce, key_stream_index)
    }

    async fn decrypt_with_offset(
        &self,
        secret_box: &SecretBox,
        key: &SecretKey,
        aad: &[u8],
        key_stream_index: u64,
    ) -> Result<Vec<u8>> {
        self.check_args(secret_box.nonce(), aad)?;
        validate::length("AES-CTR mac", secret_box.mac().len(), 0)?;
        let key = key.extract().await?;
        self.decrypt_core(secret_box, key, key_stream_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_answer_aes128() {
        // AES-128-CTR, key of 0x02 bytes, nonce of 0x01 bytes,
        // counter block = nonce || be32(0).
        let key = SecretKey::new(vec![0x02; 16]);
        let nonce = Nonce::new(vec![0x01; 12]);
        let sealed = AesCtr::aes128()
            .encrypt(&[1, 2, 3], &key, Some(&nonce), &[])
            .await
            .unwrap();
        assert_eq!(sealed.cipher_text(), hex::decode("381f47").unwrap());
        assert!(sealed.mac().is_empty());
    }

    #[tokio::test]
    async fn round_trip_across_block_boundaries() {
        let cipher = AesCtr::aes256();
        let key = cipher.new_secret_key().await.unwrap();
        for len in 0..=40 {
            let clear: Vec<u8> = (0..len as u8).collect();
            let sealed = cipher.encrypt(&clear, &key, None, &[]).await.unwrap();
            assert_eq!(sealed.cipher_text().len(), cipher.cipher_text_length(len));
            let opened = cipher.decrypt(&sealed, &key, &[]).await.unwrap();
            assert_eq!(opened, clear);
        }
    }

    #[tokio::test]
    async fn keystream_is_seekable() {
        let cipher = AesCtr::aes128();
        let key = cipher.new_secret_key().await.unwrap();
        let nonce = cipher.new_nonce();
        let message: Vec<u8> = (0..100u8).collect();

        let full = cipher
            .encrypt_with_offset(&message, &key, Some(&nonce), &[], 0)
            .await
            .unwrap();
        // Encrypting the tail at its offset must match the slice of the
        // full encryption, including offsets inside a block.
        for split in [1usize, 15, 16, 17, 64, 99] {
            let tail = cipher
                .encrypt_with_offset(&message[split..], &key, Some(&nonce), &[], split as u64)
                .await
                .unwrap();
            assert_eq!(tail.cipher_text(), &full.cipher_text()[split..]);
        }
    }

    #[tokio::test]
    async fn sync_and_async_agree() {
        let cipher = AesCtr::aes128();
        let key = cipher.new_secret_key().await.unwrap();
        let nonce = cipher.new_nonce();
        let sealed = cipher
            .encrypt(b"duality", &key, Some(&nonce), &[])
            .await
            .unwrap();
        let sealed_sync = cipher
            .encrypt_sync(b"duality", &key, Some(&nonce), &[])
            .unwrap();
        assert_eq!(sealed, sealed_sync);
        assert_eq!(cipher.decrypt_sync(&sealed, &key, &[]).unwrap(), b"duality");
    }

    #[tokio::test]
    async fn rejects_bad_arguments() {
        let cipher = AesCtr::aes128();
        let key = cipher.new_secret_key().await.unwrap();
        let short_nonce = Nonce::new(vec![0u8; 8]);
        assert!(matches!(
            cipher.encrypt(b"x", &key, Some(&short_nonce), &[]).await,
            Err(Error::InvalidLength { .. })
        ));
        assert!(matches!(
            cipher.encrypt(b"x", &key, None, b"aad").await,
            Err(Error::InvalidParameter { .. })
        ));
        let wrong_key = SecretKey::new(vec![0u8; 32]);
        assert!(matches!(
            cipher.encrypt(b"x", &wrong_key, None, &[]).await,
            Err(Error::InvalidLength { .. })
        ));
    }
}
