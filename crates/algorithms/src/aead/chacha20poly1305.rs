//! ChaCha20-Poly1305 AEAD (RFC 8439)
//!
//! A concrete instance of the cipher-then-MAC composition: the one-time
//! Poly1305 key comes from keystream block 0, encryption starts at block
//! 1, and the tag rides out-of-band in the envelope's `mac` field.

use async_trait::async_trait;

use xcrypt_api::error::{validate, Result};
use xcrypt_api::{
    Cipher, DecryptorSink, EncryptorSink, Nonce, SecretBox, SecretBytes, SecretKey,
    StreamingCipher,
};

use crate::mac::{aead_tag, poly1305_key, POLY1305_TAG_SIZE};
use crate::stream::{Chacha20, CHACHA20_BLOCK_SIZE, CHACHA20_KEY_SIZE, CHACHA20_NONCE_SIZE};
use crate::streaming::{Chacha20Poly1305Decryptor, Chacha20Poly1305Encryptor};

/// ChaCha20-Poly1305 authenticated encryption with associated data
#[derive(Clone, Copy, Debug, Default)]
pub struct Chacha20Poly1305;

impl Chacha20Poly1305 {
    /// Create the cipher
    pub fn new() -> Self {
        Self
    }

    fn check_args(&self, nonce: &Nonce) -> Result<()> {
        validate::length(
            "ChaCha20-Poly1305 nonce",
            nonce.len(),
            CHACHA20_NONCE_SIZE,
        )
    }

    fn encrypt_core(
        &self,
        clear_text: &[u8],
        key: &SecretBytes,
        nonce: Nonce,
        aad: &[u8],
    ) -> Result<SecretBox> {
        validate::length("ChaCha20-Poly1305 key", key.len(), CHACHA20_KEY_SIZE)?;
        let poly_key = poly1305_key(key.as_ref(), nonce.as_ref())?;

        let mut cipher_text = clear_text.to_vec();
        Chacha20::apply_keystream(
            key.as_ref(),
            nonce.as_ref(),
            CHACHA20_BLOCK_SIZE as u64,
            &mut cipher_text,
        )?;
        let mac = aead_tag(&poly_key, aad, &cipher_text);
        Ok(SecretBox::new(nonce, cipher_text, mac))
    }

    fn decrypt_core(
        &self,
        secret_box: &SecretBox,
        key: &SecretBytes,
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        validate::length("ChaCha20-Poly1305 key", key.len(), CHACHA20_KEY_SIZE)?;
        let nonce = secret_box.nonce();
        let poly_key = poly1305_key(key.as_ref(), nonce.as_ref())?;

        // Authenticate before any decryption work; an attacker must never
        // observe decrypted-but-unauthenticated bytes.
        let expected = aead_tag(&poly_key, aad, secret_box.cipher_text());
        validate::authentication(&expected == secret_box.mac(), "ChaCha20-Poly1305")?;

        let mut clear_text = secret_box.cipher_text().to_vec();
        Chacha20::apply_keystream(
            key.as_ref(),
            nonce.as_ref(),
            CHACHA20_BLOCK_SIZE as u64,
            &mut clear_text,
        )?;
        Ok(clear_text)
    }
}

#[async_trait]
impl Cipher for Chacha20Poly1305 {
    fn name(&self) -> &str {
        "ChaCha20-Poly1305"
    }

    fn secret_key_length(&self) -> usize {
        CHACHA20_KEY_SIZE
    }

    fn nonce_length(&self) -> usize {
        CHACHA20_NONCE_SIZE
    }

    fn mac_length(&self) -> usize {
        POLY1305_TAG_SIZE
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
        validate::length(
            "ChaCha20-Poly1305 mac",
            secret_box.mac().len(),
            POLY1305_TAG_SIZE,
        )?;
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
        validate::length(
            "ChaCha20-Poly1305 mac",
            secret_box.mac().len(),
            POLY1305_TAG_SIZE,
        )?;
        self.decrypt_core(secret_box, key.extract_sync()?, aad)
    }
}

#[async_trait]
impl StreamingCipher for Chacha20Poly1305 {
    async fn encryptor(
        &self,
        key: &SecretKey,
        nonce: &Nonce,
        aad: &[u8],
    ) -> Result<Box<dyn EncryptorSink>> {
        self.check_args(nonce)?;
        let key = key.extract().await?;
        Ok(Box::new(Chacha20Poly1305Encryptor::new(
            key.as_ref(),
            nonce.as_ref(),
            aad,
        )?))
    }

    async fn decryptor(
        &self,
        key: &SecretKey,
        nonce: &Nonce,
        aad: &[u8],
    ) -> Result<Box<dyn DecryptorSink>> {
        self.check_args(nonce)?;
        let key = key.extract().await?;
        Ok(Box::new(Chacha20Poly1305Decryptor::new(
            key.as_ref(),
            nonce.as_ref(),
            aad,
        )?))
    }
}
