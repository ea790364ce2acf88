//! ChaCha20 stream cipher (RFC 8439)
//!
//! Unauthenticated keystream cipher; the AEAD construction lives in
//! [`crate::aead::chacha20poly1305`].

use async_trait::async_trait;
use chacha20::cipher::{KeyIvInit, StreamCipher, StreamCipherSeek};

use xcrypt_api::error::{validate, Error, Result};
use xcrypt_api::{Cipher, KeystreamCipher, Mac, Nonce, SecretBox, SecretBytes, SecretKey};

/// Size of the ChaCha20 key in bytes
pub const CHACHA20_KEY_SIZE: usize = 32;
/// Size of the ChaCha20 nonce in bytes
pub const CHACHA20_NONCE_SIZE: usize = 12;
/// Size of a ChaCha20 keystream block in bytes
pub const CHACHA20_BLOCK_SIZE: usize = 64;

/// ChaCha20 with a 96-bit nonce and 32-bit block counter
#[derive(Clone, Copy, Debug, Default)]
pub struct Chacha20;

impl Chacha20 {
    /// Create the cipher
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn apply_keystream(
        key: &[u8],
        nonce: &[u8],
        offset: u64,
        data: &mut [u8],
    ) -> Result<()> {
        let mut cipher = chacha20::ChaCha20::new_from_slices(key, nonce)
            .map_err(|_| Error::param("ChaCha20 key", "key/nonce rejected by cipher core"))?;
        cipher.seek(offset);
        cipher.apply_keystream(data);
        Ok(())
    }

    fn check_args(&self, nonce: &Nonce, aad: &[u8]) -> Result<()> {
        validate::length("ChaCha20 nonce", nonce.len(), CHACHA20_NONCE_SIZE)?;
        validate::parameter(aad.is_empty(), "aad", "ChaCha20 does not authenticate data")
    }

    fn encrypt_core(
        &self,
        clear_text: &[u8],
        key: &SecretBytes,
        nonce: Nonce,
        offset: u64,
    ) -> Result<SecretBox> {
        validate::length("ChaCha20 key", key.len(), CHACHA20_KEY_SIZE)?;
        let mut out = clear_text.to_vec();
        Self::apply_keystream(key.as_ref(), nonce.as_ref(), offset, &mut out)?;
        Ok(SecretBox::new(nonce, out, Mac::empty()))
    }

    fn decrypt_core(
        &self,
        secret_box: &SecretBox,
        key: &SecretBytes,
        offset: u64,
    ) -> Result<Vec<u8>> {
        validate::length("ChaCha20 key", key.len(), CHACHA20_KEY_SIZE)?;
        let mut out = secret_box.cipher_text().to_vec();
        Self::apply_keystream(key.as_ref(), secret_box.nonce().as_ref(), offset, &mut out)?;
        Ok(out)
    }
}

#[async_trait]
impl Cipher for Chacha20 {
    fn name(&self) -> &str {
        "ChaCha20"
    }

    fn secret_key_length(&self) -> usize {
        CHACHA20_KEY_SIZE
    }

    fn nonce_length(&self) -> usize {
        CHACHA20_NONCE_SIZE
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
        validate::length("ChaCha20 mac", secret_box.mac().len(), 0)?;
        self.decrypt_core(secret_box, key.extract_sync()?, 0)
    }
}

#[async_trait]
impl KeystreamCipher for Chacha20 {
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
        validate::length("ChaCha20 mac", secret_box.mac().len(), 0)?;
        let key = key.extract().await?;
        self.decrypt_core(secret_box, key, key_stream_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rfc8439_keystream_vector() {
        // RFC 8439 section 2.4.2: key 00..1f, nonce 00:00:00:00:00:00:00:4a:
        // 00:00:00:00, counter 1 (keystream offset 64).
        let key = SecretKey::new(
            hex::decode("000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f")
                .unwrap(),
        );
        let nonce = Nonce::new(hex::decode("000000000000004a00000000").unwrap());
        let clear = b"Ladies and Gentlemen of the class of '99: If I could offer you only one tip for the future, sunscreen would be it.";
        let sealed = Chacha20::new()
            .encrypt_with_offset(clear, &key, Some(&nonce), &[], 64)
            .await
            .unwrap();
        let expected = hex::decode(
            "6e2e359a2568f98041ba0728dd0d6981e97e7aec1d4360c20a27afccfd9fae0b\
             f91b65c5524733ab8f593dabcd62b3571639d624e65152ab8f530c359f0861d8\
             07ca0dbf500d6a6156a38e088a22b65e52bc514d16ccf806818ce91ab7793736\
             5af90bbf74a35be6b40b8eedf2785e42874d",
        )
        .unwrap();
        assert_eq!(sealed.cipher_text(), expected);
    }

    #[tokio::test]
    async fn round_trip_and_length_contract() {
        let cipher = Chacha20::new();
        let key = cipher.new_secret_key().await.unwrap();
        for len in [0usize, 1, 63, 64, 65, 130] {
            let clear = vec![0x5au8; len];
            let sealed = cipher.encrypt(&clear, &key, None, &[]).await.unwrap();
            assert_eq!(sealed.cipher_text().len(), cipher.cipher_text_length(len));
            assert_eq!(cipher.decrypt(&sealed, &key, &[]).await.unwrap(), clear);
        }
    }

    #[tokio::test]
    async fn keystream_is_seekable() {
        let cipher = Chacha20::new();
        let key = cipher.new_secret_key().await.unwrap();
        let nonce = cipher.new_nonce();
        let message = vec![0xabu8; 200];

        let full = cipher
            .encrypt_with_offset(&message, &key, Some(&nonce), &[], 0)
            .await
            .unwrap();
        for split in [1usize, 63, 64, 65, 128, 199] {
            let tail = cipher
                .encrypt_with_offset(&message[split..], &key, Some(&nonce), &[], split as u64)
                .await
                .unwrap();
            assert_eq!(tail.cipher_text(), &full.cipher_text()[split..]);
        }
    }
}
