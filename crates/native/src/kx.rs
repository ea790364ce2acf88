//! Delegating ECDH
//!
//! Same shape as [`crate::sign::DelegatingSignature`]: native-backed
//! with an optional pure fallback; without one, unsupported platforms
//! and backends surface an explicit failure.

use core::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use xcrypt_api::error::{Error, Result};
use xcrypt_api::{EcCurve, KeyExchangeAlgorithm, KeyPair, PublicKey, SecretKey};

use crate::channel::CallArgs;
use crate::cipher::{surface, NativeFail};
use crate::context::NativeContext;
use crate::platform::AlgorithmFamily;
use crate::queue::payload_weight;
use crate::sign::{ec_material, generate_ec_key_pair_reply};

/// ECDH routed through the native channel
pub struct DelegatingKeyExchange {
    curve: EcCurve,
    fallback: Option<Arc<dyn KeyExchangeAlgorithm>>,
    context: NativeContext,
    name: String,
}

impl DelegatingKeyExchange {
    /// Native-only ECDH for the given curve
    pub fn new(curve: EcCurve, context: NativeContext) -> Self {
        Self {
            curve,
            fallback: None,
            context,
            name: format!("ECDH-{}", curve.name()),
        }
    }

    /// ECDH with a pure fallback to resolve unsupported backends
    pub fn with_fallback(
        curve: EcCurve,
        context: NativeContext,
        fallback: Arc<dyn KeyExchangeAlgorithm>,
    ) -> Self {
        Self {
            fallback: Some(fallback),
            ..Self::new(curve, context)
        }
    }

    fn available(&self) -> bool {
        self.context.support.supports(AlgorithmFamily::Ecdh)
    }
}

impl fmt::Debug for DelegatingKeyExchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DelegatingKeyExchange({})", self.name)
    }
}

#[async_trait]
impl KeyExchangeAlgorithm for DelegatingKeyExchange {
    fn name(&self) -> &str {
        &self.name
    }

    async fn new_key_pair(&self) -> Result<KeyPair> {
        if !self.available() {
            return match &self.fallback {
                Some(fallback) => fallback.new_key_pair().await,
                None => Err(Error::Unsupported {
                    operation: "ECDH key generation",
                }),
            };
        }
        let weight = 3 * self.curve.field_length();
        let _permit = Arc::clone(&self.context.queue).acquire(weight).await;
        let args = CallArgs::new().str("curve", self.curve.name());
        match self.context.channel.call("Ecdh.newKeyPair", args).await {
            Ok(reply) => Ok(generate_ec_key_pair_reply(
                self.curve,
                &reply,
                "Ecdh.newKeyPair",
            )),
            Err(error) => match surface(error, "ECDH") {
                NativeFail::Unsupported => match &self.fallback {
                    Some(fallback) => fallback.new_key_pair().await,
                    None => Err(Error::Unsupported {
                        operation: "ECDH key generation",
                    }),
                },
                NativeFail::Error(error) => Err(error),
            },
        }
    }

    async fn shared_secret_key(
        &self,
        key_pair: &KeyPair,
        remote_public_key: &PublicKey,
    ) -> Result<SecretKey> {
        let (d, x, y) = ec_material(key_pair, self.curve, "Ecdh.sharedSecretKey")?;
        let (remote_x, remote_y) = match remote_public_key {
            PublicKey::Ec { curve, x, y } if *curve == self.curve => {
                (x.as_slice(), y.as_slice())
            }
            _ => {
                return Err(Error::param(
                    "Ecdh.sharedSecretKey",
                    "remote key does not match the curve",
                ))
            }
        };
        if !self.available() {
            return match &self.fallback {
                Some(fallback) => {
                    fallback
                        .shared_secret_key(key_pair, remote_public_key)
                        .await
                }
                None => Err(Error::Unsupported {
                    operation: "ECDH key agreement",
                }),
            };
        }
        let weight = payload_weight(&[d.as_ref(), x, y, remote_x, remote_y]);
        let _permit = Arc::clone(&self.context.queue).acquire(weight).await;
        let args = CallArgs::new()
            .str("curve", self.curve.name())
            .bytes("localD", d.as_ref())
            .bytes("localX", x)
            .bytes("localY", y)
            .bytes("remoteX", remote_x)
            .bytes("remoteY", remote_y);
        match self
            .context
            .channel
            .call("Ecdh.sharedSecretKey", args)
            .await
        {
            Ok(reply) => {
                let bytes = reply.require_bytes("bytes", "Ecdh.sharedSecretKey");
                let expected = self.curve.field_length();
                if bytes.len() != expected {
                    tracing::error!(
                        curve = self.curve.name(),
                        expected,
                        actual = bytes.len(),
                        "native shared secret violates the length contract"
                    );
                    panic!(
                        "native backend returned a malformed shared secret for {}",
                        self.curve.name()
                    );
                }
                Ok(SecretKey::new(bytes.to_vec()))
            }
            Err(error) => match surface(error, "ECDH") {
                NativeFail::Unsupported => match &self.fallback {
                    Some(fallback) => {
                        fallback
                            .shared_secret_key(key_pair, remote_public_key)
                            .await
                    }
                    None => Err(Error::Unsupported {
                        operation: "ECDH key agreement",
                    }),
                },
                NativeFail::Error(error) => Err(error),
            },
        }
    }
}
