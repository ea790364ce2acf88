//! HMAC (RFC 2104) over the SHA-2 family

use async_trait::async_trait;
use hmac::{Hmac as HmacCore, Mac as _};

use xcrypt_api::error::{validate, Error, Result};
use xcrypt_api::{Mac, MacAlgorithm, MacSink, Nonce, SecretKey};

type HmacSha256 = HmacCore<sha2::Sha256>;
type HmacSha512 = HmacCore<sha2::Sha512>;

#[derive(Clone, Copy, Debug)]
enum Variant {
    Sha256,
    Sha512,
}

/// HMAC keyed by a [`SecretKey`] of any length
///
/// The nonce argument of the MAC contract is ignored; associated data is
/// not supported.
#[derive(Clone, Copy, Debug)]
pub struct Hmac {
    variant: Variant,
}

impl Hmac {
    /// HMAC-SHA256
    pub fn sha256() -> Self {
        Self {
            variant: Variant::Sha256,
        }
    }

    /// HMAC-SHA512
    pub fn sha512() -> Self {
        Self {
            variant: Variant::Sha512,
        }
    }

    fn keyed_state(&self, key: &[u8]) -> Result<State> {
        // HMAC accepts any key length; the error arm is unreachable in
        // practice but propagated rather than unwrapped.
        let rejected = |_| Error::param("HMAC key", "rejected by mac core");
        Ok(match self.variant {
            Variant::Sha256 => {
                State::Sha256(HmacSha256::new_from_slice(key).map_err(rejected)?)
            }
            Variant::Sha512 => {
                State::Sha512(HmacSha512::new_from_slice(key).map_err(rejected)?)
            }
        })
    }
}

enum State {
    Sha256(HmacSha256),
    Sha512(HmacSha512),
}

impl State {
    fn update(&mut self, data: &[u8]) {
        match self {
            State::Sha256(mac) => mac.update(data),
            State::Sha512(mac) => mac.update(data),
        }
    }

    fn finalize_reset(&mut self) -> Vec<u8> {
        match self {
            State::Sha256(mac) => mac.finalize_reset().into_bytes().to_vec(),
            State::Sha512(mac) => mac.finalize_reset().into_bytes().to_vec(),
        }
    }
}

#[async_trait]
impl MacAlgorithm for Hmac {
    fn name(&self) -> &'static str {
        match self.variant {
            Variant::Sha256 => "HMAC-SHA256",
            Variant::Sha512 => "HMAC-SHA512",
        }
    }

    fn mac_length(&self) -> usize {
        match self.variant {
            Variant::Sha256 => 32,
            Variant::Sha512 => 64,
        }
    }

    fn supports_key_length(&self, _length: usize) -> bool {
        true
    }

    fn calculate_sync(
        &self,
        data: &[u8],
        key: &SecretKey,
        _nonce: &Nonce,
        aad: &[u8],
    ) -> Result<Mac> {
        validate::parameter(aad.is_empty(), "aad", "HMAC does not authenticate extra data")?;
        let mut state = self.keyed_state(key.extract_sync()?.as_ref())?;
        state.update(data);
        Ok(Mac::new(state.finalize_reset()))
    }

    async fn new_sink(
        &self,
        key: &SecretKey,
        _nonce: &Nonce,
        aad: &[u8],
    ) -> Result<Box<dyn MacSink>> {
        validate::parameter(aad.is_empty(), "aad", "HMAC does not authenticate extra data")?;
        let key = key.extract().await?;
        Ok(Box::new(HmacSink {
            state: self.keyed_state(key.as_ref())?,
            tag: None,
        }))
    }
}

struct HmacSink {
    state: State,
    tag: Option<Mac>,
}

impl MacSink for HmacSink {
    fn add(&mut self, chunk: &[u8]) -> Result<()> {
        if self.tag.is_some() {
            return Err(Error::SinkClosed { context: "HMAC" });
        }
        self.state.update(chunk);
        Ok(())
    }

    fn add_slice(&mut self, chunk: &[u8], start: usize, end: usize, is_last: bool) -> Result<()> {
        validate::parameter(
            start <= end && end <= chunk.len(),
            "slice",
            "start/end out of bounds",
        )?;
        self.add(&chunk[start..end])?;
        if is_last {
            self.close();
        }
        Ok(())
    }

    fn close(&mut self) -> Mac {
        if let Some(tag) = &self.tag {
            return tag.clone();
        }
        let tag = Mac::new(self.state.finalize_reset());
        self.tag = Some(tag.clone());
        tag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 4231 test case 1
    const RFC4231_KEY: [u8; 20] = [0x0b; 20];
    const RFC4231_DATA: &[u8] = b"Hi There";

    #[tokio::test]
    async fn rfc4231_case_1_sha256() {
        let key = SecretKey::new(RFC4231_KEY.to_vec());
        let tag = Hmac::sha256()
            .calculate(RFC4231_DATA, &key, &Nonce::empty(), &[])
            .await
            .unwrap();
        assert_eq!(
            tag.as_ref(),
            hex::decode("b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff7")
                .unwrap()
        );
    }

    #[tokio::test]
    async fn rfc4231_case_1_sha512() {
        let key = SecretKey::new(RFC4231_KEY.to_vec());
        let tag = Hmac::sha512()
            .calculate(RFC4231_DATA, &key, &Nonce::empty(), &[])
            .await
            .unwrap();
        assert_eq!(
            tag.as_ref(),
            hex::decode(
                "87aa7cdea5ef619d4ff0b4241a1d6cb02379f4e2ce4ec2787ad0b30545e17cde\
                 daa833b7d6b8a702038b274eaea3f4e4be9d914eeb61f1702e696c203a126854"
            )
            .unwrap()
        );
    }

    #[tokio::test]
    async fn sink_is_incremental_and_close_idempotent() {
        let key = SecretKey::new(RFC4231_KEY.to_vec());
        let hmac = Hmac::sha256();
        let mut sink = hmac.new_sink(&key, &Nonce::empty(), &[]).await.unwrap();
        sink.add(b"Hi ").unwrap();
        sink.add(b"There").unwrap();
        let first = sink.close();
        let second = sink.close();
        assert_eq!(first, second);
        assert!(matches!(
            sink.add(b"more"),
            Err(Error::SinkClosed { .. })
        ));

        let oneshot = hmac
            .calculate_sync(RFC4231_DATA, &key, &Nonce::empty(), &[])
            .unwrap();
        assert_eq!(first, oneshot);
    }

    #[tokio::test]
    async fn add_slice_honors_bounds_and_is_last() {
        let key = SecretKey::new(vec![1u8; 16]);
        let hmac = Hmac::sha256();
        let mut sink = hmac.new_sink(&key, &Nonce::empty(), &[]).await.unwrap();
        sink.add_slice(b"xxhelloxx", 2, 7, true).unwrap();
        assert!(sink.add(b"y").is_err());
        let expected = hmac
            .calculate_sync(b"hello", &key, &Nonce::empty(), &[])
            .unwrap();
        assert_eq!(sink.close(), expected);
    }
}
