//! SHA-2 hash functions

use async_trait::async_trait;
use sha2::Digest as _;

use xcrypt_api::error::{validate, Error, Result};
use xcrypt_api::{Digest, HashAlgorithm, HashSink};

/// SHA-256
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256;

/// SHA-512
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha512;

#[async_trait]
impl HashAlgorithm for Sha256 {
    fn name(&self) -> &str {
        "SHA-256"
    }

    fn digest_length(&self) -> usize {
        32
    }

    fn block_length(&self) -> usize {
        64
    }

    fn new_sink(&self) -> Box<dyn HashSink> {
        Box::new(Sha256Sink {
            hasher: sha2::Sha256::new(),
            digest: None,
        })
    }
}

#[async_trait]
impl HashAlgorithm for Sha512 {
    fn name(&self) -> &str {
        "SHA-512"
    }

    fn digest_length(&self) -> usize {
        64
    }

    fn block_length(&self) -> usize {
        128
    }

    fn new_sink(&self) -> Box<dyn HashSink> {
        Box::new(Sha512Sink {
            hasher: sha2::Sha512::new(),
            digest: None,
        })
    }
}

struct Sha256Sink {
    hasher: sha2::Sha256,
    digest: Option<Digest>,
}

struct Sha512Sink {
    hasher: sha2::Sha512,
    digest: Option<Digest>,
}

impl HashSink for Sha256Sink {
    fn add(&mut self, chunk: &[u8]) -> Result<()> {
        if self.digest.is_some() {
            return Err(Error::SinkClosed { context: "SHA-256" });
        }
        self.hasher.update(chunk);
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

    fn close(&mut self) -> Digest {
        if let Some(digest) = &self.digest {
            return digest.clone();
        }
        let digest = Digest::new(self.hasher.finalize_reset().to_vec());
        self.digest = Some(digest.clone());
        digest
    }
}

impl HashSink for Sha512Sink {
    fn add(&mut self, chunk: &[u8]) -> Result<()> {
        if self.digest.is_some() {
            return Err(Error::SinkClosed { context: "SHA-512" });
        }
        self.hasher.update(chunk);
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

    fn close(&mut self) -> Digest {
        if let Some(digest) = &self.digest {
            return digest.clone();
        }
        let digest = Digest::new(self.hasher.finalize_reset().to_vec());
        self.digest = Some(digest.clone());
        digest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn nist_vectors() {
        // FIPS 180-2 "abc" vectors.
        let digest = Sha256.hash(b"abc").await.unwrap();
        assert_eq!(
            digest.as_ref(),
            hex::decode("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
                .unwrap()
        );
        let digest = Sha512.hash(b"abc").await.unwrap();
        assert_eq!(
            digest.as_ref(),
            hex::decode(
                "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a\
                 2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
            )
            .unwrap()
        );
    }

    #[test]
    fn sink_close_is_idempotent() {
        let mut sink = Sha256.new_sink();
        sink.add(b"ab").unwrap();
        sink.add_slice(b"xcx", 1, 2, true).unwrap();
        let first = sink.close();
        assert_eq!(first, sink.close());
        assert!(matches!(sink.add(b"d"), Err(Error::SinkClosed { .. })));
        assert_eq!(first, Sha256.hash_sync(b"abc").unwrap());
    }

    #[test]
    fn empty_input() {
        let digest = Sha256.hash_sync(&[]).unwrap();
        assert_eq!(
            digest.as_ref(),
            hex::decode("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .unwrap()
        );
    }
}
