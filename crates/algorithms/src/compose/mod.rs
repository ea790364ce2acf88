//! Authenticated encryption built from a cipher and a MAC
//!
//! Both combinators encrypt first and authenticate the *cipher text*
//! (encrypt-then-MAC). Decryption recomputes the tag and compares in
//! constant time before any decryption work; on mismatch the
//! authentication failure is returned without running the decryption
//! transform. They are themselves ciphers and wrap pure or delegating
//! inner ciphers transparently.

use core::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use xcrypt_api::error::{validate, Result};
use xcrypt_api::{Cipher, Mac, MacAlgorithm, Nonce, SecretBox, SecretKey};

fn check_inner(cipher: &dyn Cipher, mac: &dyn MacAlgorithm) -> Result<()> {
    validate::parameter(
        !cipher.is_authenticated(),
        "cipher",
        "inner cipher must be unauthenticated",
    )?;
    validate::parameter(
        mac.supports_key_length(cipher.secret_key_length()),
        "mac",
        "MAC does not accept the cipher's key length",
    )
}

fn check_aad(mac: &dyn MacAlgorithm, aad: &[u8]) -> Result<()> {
    validate::parameter(
        aad.is_empty() || mac.supports_aad(),
        "aad",
        "wrapped MAC does not authenticate extra data",
    )
}

/// Cipher text with the tag appended: `cipher_text || mac`
///
/// The envelope's `mac` field stays empty; the tag travels inside the
/// cipher text. Useful where the consumer expects one opaque blob.
pub struct CipherWithAppendedMac {
    cipher: Arc<dyn Cipher>,
    mac: Arc<dyn MacAlgorithm>,
    name: String,
}

impl CipherWithAppendedMac {
    /// Combine an unauthenticated cipher with a MAC
    pub fn new(cipher: Arc<dyn Cipher>, mac: Arc<dyn MacAlgorithm>) -> Result<Self> {
        check_inner(cipher.as_ref(), mac.as_ref())?;
        let name = format!("{}+{}", cipher.name(), mac.name());
        Ok(Self { cipher, mac, name })
    }
}

impl fmt::Debug for CipherWithAppendedMac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CipherWithAppendedMac({})", self.name)
    }
}

#[async_trait]
impl Cipher for CipherWithAppendedMac {
    fn name(&self) -> &str {
        &self.name
    }

    fn secret_key_length(&self) -> usize {
        self.cipher.secret_key_length()
    }

    fn nonce_length(&self) -> usize {
        self.cipher.nonce_length()
    }

    fn mac_length(&self) -> usize {
        0
    }

    fn is_authenticated(&self) -> bool {
        true
    }

    fn supports_aad(&self) -> bool {
        self.mac.supports_aad()
    }

    fn cipher_text_length(&self, clear_text_length: usize) -> usize {
        self.cipher.cipher_text_length(clear_text_length) + self.mac.mac_length()
    }

    async fn encrypt(
        &self,
        clear_text: &[u8],
        key: &SecretKey,
        nonce: Option<&Nonce>,
        aad: &[u8],
    ) -> Result<SecretBox> {
        check_aad(self.mac.as_ref(), aad)?;
        let inner = self.cipher.encrypt(clear_text, key, nonce, &[]).await?;
        let tag = self
            .mac
            .calculate(inner.cipher_text(), key, inner.nonce(), aad)
            .await?;
        let mut cipher_text = inner.cipher_text().to_vec();
        cipher_text.extend_from_slice(tag.as_ref());
        Ok(SecretBox::new(inner.nonce().clone(), cipher_text, Mac::empty()))
    }

    async fn decrypt(
        &self,
        secret_box: &SecretBox,
        key: &SecretKey,
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        check_aad(self.mac.as_ref(), aad)?;
        let tag_length = self.mac.mac_length();
        validate::min_length(
            "appended mac",
            secret_box.cipher_text().len(),
            tag_length,
        )?;
        let split = secret_box.cipher_text().len() - tag_length;
        let (body, tag) = secret_box.cipher_text().split_at(split);

        let expected = self
            .mac
            .calculate(body, key, secret_box.nonce(), aad)
            .await?;
        validate::authentication(expected == Mac::new(tag.to_vec()), self.mac.name())?;

        let inner = SecretBox::new(secret_box.nonce().clone(), body.to_vec(), Mac::empty());
        self.cipher.decrypt(&inner, key, &[]).await
    }

    fn encrypt_sync(
        &self,
        clear_text: &[u8],
        key: &SecretKey,
        nonce: Option<&Nonce>,
        aad: &[u8],
    ) -> Result<SecretBox> {
        check_aad(self.mac.as_ref(), aad)?;
        let inner = self.cipher.encrypt_sync(clear_text, key, nonce, &[])?;
        let tag = self
            .mac
            .calculate_sync(inner.cipher_text(), key, inner.nonce(), aad)?;
        let mut cipher_text = inner.cipher_text().to_vec();
        cipher_text.extend_from_slice(tag.as_ref());
        Ok(SecretBox::new(inner.nonce().clone(), cipher_text, Mac::empty()))
    }

    fn decrypt_sync(
        &self,
        secret_box: &SecretBox,
        key: &SecretKey,
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        check_aad(self.mac.as_ref(), aad)?;
        let tag_length = self.mac.mac_length();
        validate::min_length(
            "appended mac",
            secret_box.cipher_text().len(),
            tag_length,
        )?;
        let split = secret_box.cipher_text().len() - tag_length;
        let (body, tag) = secret_box.cipher_text().split_at(split);

        let expected = self.mac.calculate_sync(body, key, secret_box.nonce(), aad)?;
        validate::authentication(expected == Mac::new(tag.to_vec()), self.mac.name())?;

        let inner = SecretBox::new(secret_box.nonce().clone(), body.to_vec(), Mac::empty());
        self.cipher.decrypt_sync(&inner, key, &[])
    }
}

/// Cipher text and tag as a structured pair in the envelope
///
/// The cipher text length equals the inner cipher's; the tag rides in
/// the envelope's `mac` field. AAD is forbidden unless the wrapped MAC
/// declares support.
pub struct AuthenticatedCipher {
    cipher: Arc<dyn Cipher>,
    mac: Arc<dyn MacAlgorithm>,
    name: String,
}

impl AuthenticatedCipher {
    /// Combine an unauthenticated cipher with a MAC
    pub fn new(cipher: Arc<dyn Cipher>, mac: Arc<dyn MacAlgorithm>) -> Result<Self> {
        check_inner(cipher.as_ref(), mac.as_ref())?;
        let name = format!("{}/{}", cipher.name(), mac.name());
        Ok(Self { cipher, mac, name })
    }
}

impl fmt::Debug for AuthenticatedCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthenticatedCipher({})", self.name)
    }
}

#[async_trait]
impl Cipher for AuthenticatedCipher {
    fn name(&self) -> &str {
        &self.name
    }

    fn secret_key_length(&self) -> usize {
        self.cipher.secret_key_length()
    }

    fn nonce_length(&self) -> usize {
        self.cipher.nonce_length()
    }

    fn mac_length(&self) -> usize {
        self.mac.mac_length()
    }

    fn supports_aad(&self) -> bool {
        self.mac.supports_aad()
    }

    fn cipher_text_length(&self, clear_text_length: usize) -> usize {
        self.cipher.cipher_text_length(clear_text_length)
    }

    async fn encrypt(
        &self,
        clear_text: &[u8],
        key: &SecretKey,
        nonce: Option<&Nonce>,
        aad: &[u8],
    ) -> Result<SecretBox> {
        check_aad(self.mac.as_ref(), aad)?;
        let inner = self.cipher.encrypt(clear_text, key, nonce, &[]).await?;
        let tag = self
            .mac
            .calculate(inner.cipher_text(), key, inner.nonce(), aad)
            .await?;
        Ok(SecretBox::new(
            inner.nonce().clone(),
            inner.cipher_text().to_vec(),
            tag,
        ))
    }

    async fn decrypt(
        &self,
        secret_box: &SecretBox,
        key: &SecretKey,
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        check_aad(self.mac.as_ref(), aad)?;
        validate::length(
            "mac",
            secret_box.mac().len(),
            self.mac.mac_length(),
        )?;
        let expected = self
            .mac
            .calculate(secret_box.cipher_text(), key, secret_box.nonce(), aad)
            .await?;
        validate::authentication(&expected == secret_box.mac(), self.mac.name())?;

        let inner = SecretBox::new(
            secret_box.nonce().clone(),
            secret_box.cipher_text().to_vec(),
            Mac::empty(),
        );
        self.cipher.decrypt(&inner, key, &[]).await
    }

    fn encrypt_sync(
        &self,
        clear_text: &[u8],
        key: &SecretKey,
        nonce: Option<&Nonce>,
        aad: &[u8],
    ) -> Result<SecretBox> {
        check_aad(self.mac.as_ref(), aad)?;
        let inner = self.cipher.encrypt_sync(clear_text, key, nonce, &[])?;
        let tag = self
            .mac
            .calculate_sync(inner.cipher_text(), key, inner.nonce(), aad)?;
        Ok(SecretBox::new(
            inner.nonce().clone(),
            inner.cipher_text().to_vec(),
            tag,
        ))
    }

    fn decrypt_sync(
        &self,
        secret_box: &SecretBox,
        key: &SecretKey,
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        check_aad(self.mac.as_ref(), aad)?;
        validate::length(
            "mac",
            secret_box.mac().len(),
            self.mac.mac_length(),
        )?;
        let expected =
            self.mac
                .calculate_sync(secret_box.cipher_text(), key, secret_box.nonce(), aad)?;
        validate::authentication(&expected == secret_box.mac(), self.mac.name())?;

        let inner = SecretBox::new(
            secret_box.nonce().clone(),
            secret_box.cipher_text().to_vec(),
            Mac::empty(),
        );
        self.cipher.decrypt_sync(&inner, key, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::AesCbc;
    use crate::mac::Hmac;
    use crate::stream::AesCtr;
    use xcrypt_api::Error;

    fn ctr_hmac() -> AuthenticatedCipher {
        AuthenticatedCipher::new(Arc::new(AesCtr::aes256()), Arc::new(Hmac::sha256())).unwrap()
    }

    #[tokio::test]
    async fn authenticated_round_trip_and_lengths() {
        let cipher = ctr_hmac();
        let key = cipher.new_secret_key().await.unwrap();
        for len in [0usize, 1, 16, 17, 100] {
            let clear = vec![0x11u8; len];
            let sealed = cipher.encrypt(&clear, &key, None, &[]).await.unwrap();
            assert_eq!(sealed.cipher_text().len(), cipher.cipher_text_length(len));
            assert_eq!(sealed.mac().len(), 32);
            assert_eq!(cipher.decrypt(&sealed, &key, &[]).await.unwrap(), clear);
        }
    }

    #[tokio::test]
    async fn tampering_fails_before_decryption() {
        let cipher = ctr_hmac();
        let key = cipher.new_secret_key().await.unwrap();
        let sealed = cipher.encrypt(b"attack at dawn", &key, None, &[]).await.unwrap();

        let mut ct = sealed.cipher_text().to_vec();
        ct[0] ^= 1;
        let forged = SecretBox::new(sealed.nonce().clone(), ct, sealed.mac().clone());
        assert!(matches!(
            cipher.decrypt(&forged, &key, &[]).await,
            Err(Error::Authentication { .. })
        ));

        let mut mac = sealed.mac().as_ref().to_vec();
        mac[31] ^= 0x10;
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

    #[tokio::test]
    async fn appended_mac_concatenates_the_tag() {
        let cipher =
            CipherWithAppendedMac::new(Arc::new(AesCtr::aes256()), Arc::new(Hmac::sha256()))
                .unwrap();
        let key = cipher.new_secret_key().await.unwrap();
        let sealed = cipher.encrypt(b"blob", &key, None, &[]).await.unwrap();
        assert!(sealed.mac().is_empty());
        assert_eq!(sealed.cipher_text().len(), 4 + 32);
        assert_eq!(cipher.decrypt(&sealed, &key, &[]).await.unwrap(), b"blob");

        let mut ct = sealed.cipher_text().to_vec();
        let last = ct.len() - 1;
        ct[last] ^= 1; // flip a tag bit
        let forged = SecretBox::new(sealed.nonce().clone(), ct, Mac::empty());
        assert!(matches!(
            cipher.decrypt(&forged, &key, &[]).await,
            Err(Error::Authentication { .. })
        ));
    }

    #[tokio::test]
    async fn cbc_hmac_round_trip() {
        let cipher =
            AuthenticatedCipher::new(Arc::new(AesCbc::aes128()), Arc::new(Hmac::sha256()))
                .unwrap();
        let key = cipher.new_secret_key().await.unwrap();
        let sealed = cipher.encrypt(b"block mode", &key, None, &[]).await.unwrap();
        assert_eq!(sealed.cipher_text().len(), 16);
        assert_eq!(
            cipher.decrypt(&sealed, &key, &[]).await.unwrap(),
            b"block mode"
        );
    }

    #[tokio::test]
    async fn aad_requires_mac_support() {
        let cipher = ctr_hmac();
        let key = cipher.new_secret_key().await.unwrap();
        assert!(matches!(
            cipher.encrypt(b"x", &key, None, b"aad").await,
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn refuses_authenticated_inner_cipher() {
        let result = AuthenticatedCipher::new(
            Arc::new(crate::aead::Chacha20Poly1305::new()),
            Arc::new(Hmac::sha256()),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn sync_forms_compose() {
        let cipher = ctr_hmac();
        let key = cipher.new_secret_key().await.unwrap();
        let nonce = cipher.new_nonce();
        let sealed = cipher.encrypt_sync(b"sync", &key, Some(&nonce), &[]).unwrap();
        let sealed_async = cipher
            .encrypt(b"sync", &key, Some(&nonce), &[])
            .await
            .unwrap();
        assert_eq!(sealed, sealed_async);
        assert_eq!(cipher.decrypt_sync(&sealed, &key, &[]).unwrap(), b"sync");
    }
}
