//! AES-CBC with PKCS#7 padding
//!
//! Unauthenticated; malleable and padding-oracle-prone on its own.
//! Compose with a MAC through [`crate::compose`] before exposing
//! decryption to untrusted input.

use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use async_trait::async_trait;

use xcrypt_api::error::{validate, Error, Result};
use xcrypt_api::{Cipher, Mac, Nonce, SecretBox, SecretBytes, SecretKey};

use crate::stream::AES_BLOCK_SIZE;

/// AES in CBC mode with PKCS#7 padding
#[derive(Clone, Copy, Debug)]
pub struct AesCbc {
    key_length: usize,
}

impl AesCbc {
    /// AES-128-CBC
    pub fn aes128() -> Self {
        Self { key_length: 16 }
    }

    /// AES-256-CBC
    pub fn aes256() -> Self {
        Self { key_length: 32 }
    }

    fn check_args(&self, nonce: &Nonce, aad: &[u8]) -> Result<()> {
        validate::length("AES-CBC iv", nonce.len(), AES_BLOCK_SIZE)?;
        validate::parameter(aad.is_empty(), "aad", "AES-CBC does not authenticate data")
    }

    fn encrypt_core(
        &self,
        clear_text: &[u8],
        key: &SecretBytes,
        nonce: Nonce,
    ) -> Result<SecretBox> {
        validate::length("AES-CBC key", key.len(), self.key_length)?;

        let mut buf = clear_text.to_vec();
        let pad = AES_BLOCK_SIZE - buf.len() % AES_BLOCK_SIZE;
        buf.resize(buf.len() + pad, pad as u8);

        match key.len() {
            16 => {
                let cipher = aes::Aes128::new_from_slice(key.as_ref())
                    .map_err(|_| Error::param("AES-CBC key", "rejected by cipher core"))?;
                cbc_encrypt(&cipher, nonce.as_ref(), &mut buf);
            }
            _ => {
                let cipher = aes::Aes256::new_from_slice(key.as_ref())
                    .map_err(|_| Error::param("AES-CBC key", "rejected by cipher core"))?;
                cbc_encrypt(&cipher, nonce.as_ref(), &mut buf);
            }
        }
        Ok(SecretBox::new(nonce, buf, Mac::empty()))
    }

    fn decrypt_core(&self, secret_box: &SecretBox, key: &SecretBytes) -> Result<Vec<u8>> {
        validate::length("AES-CBC key", key.len(), self.key_length)?;
        let cipher_text = secret_box.cipher_text();
        if cipher_text.is_empty() || cipher_text.len() % AES_BLOCK_SIZE != 0 {
            return Err(Error::param(
                "AES-CBC cipher text",
                "length is not a positive multiple of the block size",
            ));
        }

        let mut buf = cipher_text.to_vec();
        match key.len() {
            16 => {
                let cipher = aes::Aes128::new_from_slice(key.as_ref())
                    .map_err(|_| Error::param("AES-CBC key", "rejected by cipher core"))?;
                cbc_decrypt(&cipher, secret_box.nonce().as_ref(), &mut buf);
            }
            _ => {
                let cipher = aes::Aes256::new_from_slice(key.as_ref())
                    .map_err(|_| Error::param("AES-CBC key", "rejected by cipher core"))?;
                cbc_decrypt(&cipher, secret_box.nonce().as_ref(), &mut buf);
            }
        }
        unpad(&mut buf)?;
        Ok(buf)
    }
}

fn cbc_encrypt<C: BlockEncrypt>(cipher: &C, iv: &[u8], buf: &mut [u8]) {
    let mut prev = [0u8; AES_BLOCK_SIZE];
    prev.copy_from_slice(iv);
    for block in buf.chunks_exact_mut(AES_BLOCK_SIZE) {
        for (b, p) in block.iter_mut().zip(prev.iter()) {
            *b ^= p;
        }
        cipher.encrypt_block(aes::cipher::Block::<C>::from_mut_slice(block));
        prev.copy_from_slice(block);
    }
}

fn cbc_decrypt<C: BlockDecrypt>(cipher: &C, iv: &[u8], buf: &mut [u8]) {
    let mut prev = [0u8; AES_BLOCK_SIZE];
    prev.copy_from_slice(iv);
    for block in buf.chunks_exact_mut(AES_BLOCK_SIZE) {
        let mut saved = [0u8; AES_BLOCK_SIZE];
        saved.copy_from_slice(block);
        cipher.decrypt_block(aes::cipher::Block::<C>::from_mut_slice(block));
        for (b, p) in block.iter_mut().zip(prev.iter()) {
            *b ^= p;
        }
        prev = saved;
    }
}

/// Strip PKCS#7 padding, failing on any malformed tail
pub(crate) fn unpad(buf: &mut Vec<u8>) -> Result<()> {
    let pad = *buf.last().unwrap_or(&0) as usize;
    let valid = pad >= 1 && pad <= AES_BLOCK_SIZE && pad <= buf.len();
    let valid = valid && buf[buf.len() - pad..].iter().all(|&b| b as usize == pad);
    validate::padding(valid, "AES-CBC")?;
    buf.truncate(buf.len() - pad);
    Ok(())
}

#[async_trait]
impl Cipher for AesCbc {
    fn name(&self) -> &str {
        match self.key_length {
            16 => "AES-128-CBC",
            _ => "AES-256-CBC",
        }
    }

    fn secret_key_length(&self) -> usize {
        self.key_length
    }

    fn nonce_length(&self) -> usize {
        AES_BLOCK_SIZE
    }

    fn cipher_text_length(&self, clear_text_length: usize) -> usize {
        (clear_text_length / AES_BLOCK_SIZE + 1) * AES_BLOCK_SIZE
    }

    async fn encrypt(
        &self,
        clear_text: &[u8],
        key: &SecretKey,
        nonce: Option<&Nonce>,
        aad: &[u8],
    ) -> Result<SecretBox> {
        let nonce = nonce.cloned().unwrap_or_else(|| self.new_nonce());
        self.check_args(&nonce, aad)?;
        let key = key.extract().await?;
        self.encrypt_core(clear_text, key, nonce)
    }

    async fn decrypt(
        &self,
        secret_box: &SecretBox,
        key: &SecretKey,
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        self.check_args(secret_box.nonce(), aad)?;
        validate::length("AES-CBC mac", secret_box.mac().len(), 0)?;
        let key = key.extract().await?;
        self.decrypt_core(secret_box, key)
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
        self.encrypt_core(clear_text, key.extract_sync()?, nonce)
    }

    fn decrypt_sync(
        &self,
        secret_box: &SecretBox,
        key: &SecretKey,
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        self.check_args(secret_box.nonce(), aad)?;
        validate::length("AES-CBC mac", secret_box.mac().len(), 0)?;
        self.decrypt_core(secret_box, key.extract_sync()?)
    }
}
