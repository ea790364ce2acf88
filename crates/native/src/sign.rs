//! Delegating ECDSA
//!
//! ECDSA over the NIST curves is native-backed: carrying a pure
//! elliptic-curve implementation is out of scope for this library, so
//! the fallback is optional. With no fallback configured, an unsupported
//! platform or backend surfaces an explicit unsupported failure instead
//! of resolving silently.

use core::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use xcrypt_api::error::{Error, Result};
use xcrypt_api::{
    EcCurve, KeyPair, PrivateMaterial, PublicKey, SecretBytes, Signature, SignatureAlgorithm,
};

use crate::channel::CallArgs;
use crate::cipher::{surface, NativeFail};
use crate::context::NativeContext;
use crate::platform::AlgorithmFamily;
use crate::queue::payload_weight;

/// Validate a native-returned key/signature component length; a mismatch
/// is a binding defect, not an input error
fn check_component(curve: EcCurve, name: &'static str, actual: usize, expected: usize) {
    if actual != expected {
        tracing::error!(
            curve = curve.name(),
            component = name,
            expected,
            actual,
            "native reply component violates the length contract"
        );
        panic!(
            "native backend returned a malformed {} for {}",
            name,
            curve.name()
        );
    }
}

pub(crate) fn generate_ec_key_pair_reply(
    curve: EcCurve,
    reply: &crate::channel::CallReply,
    operation: &str,
) -> KeyPair {
    let field = curve.field_length();
    let d = reply.require_bytes("d", operation);
    let x = reply.require_bytes("x", operation);
    let y = reply.require_bytes("y", operation);
    check_component(curve, "d", d.len(), field);
    check_component(curve, "x", x.len(), field);
    check_component(curve, "y", y.len(), field);
    KeyPair::ec(
        curve,
        SecretBytes::from_slice(d),
        x.to_vec(),
        y.to_vec(),
    )
}

pub(crate) fn ec_material<'a>(
    key_pair: &'a KeyPair,
    curve: EcCurve,
    context: &'static str,
) -> Result<(&'a SecretBytes, &'a [u8], &'a [u8])> {
    match key_pair.material() {
        PrivateMaterial::Ec {
            curve: actual,
            d,
            x,
            y,
        } if *actual == curve => Ok((d, x, y)),
        _ => Err(Error::param(context, "key pair does not match the curve")),
    }
}

/// ECDSA routed through the native channel
pub struct DelegatingSignature {
    curve: EcCurve,
    fallback: Option<Arc<dyn SignatureAlgorithm>>,
    context: NativeContext,
    name: String,
}

impl DelegatingSignature {
    /// Native-only ECDSA for the given curve
    pub fn new(curve: EcCurve, context: NativeContext) -> Self {
        Self {
            curve,
            fallback: None,
            context,
            name: format!("ECDSA-{}", curve.name()),
        }
    }

    /// ECDSA with a pure fallback to resolve unsupported backends
    pub fn with_fallback(
        curve: EcCurve,
        context: NativeContext,
        fallback: Arc<dyn SignatureAlgorithm>,
    ) -> Self {
        Self {
            fallback: Some(fallback),
            ..Self::new(curve, context)
        }
    }

    fn unsupported(&self, operation: &'static str) -> Error {
        Error::Unsupported { operation }
    }

    fn available(&self) -> bool {
        self.context.support.supports(AlgorithmFamily::Ecdsa)
    }
}

impl fmt::Debug for DelegatingSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DelegatingSignature({})", self.name)
    }
}

#[async_trait]
impl SignatureAlgorithm for DelegatingSignature {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature_length(&self) -> usize {
        2 * self.curve.field_length()
    }

    async fn new_key_pair(&self) -> Result<KeyPair> {
        if !self.available() {
            return match &self.fallback {
                Some(fallback) => fallback.new_key_pair().await,
                None => Err(self.unsupported("ECDSA key generation")),
            };
        }
        let weight = 3 * self.curve.field_length();
        let _permit = Arc::clone(&self.context.queue).acquire(weight).await;
        let args = CallArgs::new().str("curve", self.curve.name());
        match self.context.channel.call("Ecdsa.newKeyPair", args).await {
            Ok(reply) => Ok(generate_ec_key_pair_reply(
                self.curve,
                &reply,
                "Ecdsa.newKeyPair",
            )),
            Err(error) => match surface(error, "ECDSA") {
                NativeFail::Unsupported => match &self.fallback {
                    Some(fallback) => fallback.new_key_pair().await,
                    None => Err(self.unsupported("ECDSA key generation")),
                },
                NativeFail::Error(error) => Err(error),
            },
        }
    }

    async fn sign(&self, message: &[u8], key_pair: &KeyPair) -> Result<Signature> {
        let (d, x, y) = ec_material(key_pair, self.curve, "Ecdsa.sign")?;
        if !self.available() {
            return match &self.fallback {
                Some(fallback) => fallback.sign(message, key_pair).await,
                None => Err(self.unsupported("ECDSA signing")),
            };
        }
        let weight = payload_weight(&[d.as_ref(), x, y, message]);
        let _permit = Arc::clone(&self.context.queue).acquire(weight).await;
        let args = CallArgs::new()
            .str("curve", self.curve.name())
            .bytes("data", message)
            .bytes("d", d.as_ref())
            .bytes("x", x)
            .bytes("y", y);
        match self.context.channel.call("Ecdsa.sign", args).await {
            Ok(reply) => {
                let bytes = reply.require_bytes("signature", "Ecdsa.sign");
                check_component(self.curve, "signature", bytes.len(), self.signature_length());
                Ok(Signature::new(
                    bytes.to_vec(),
                    PublicKey::Ec {
                        curve: self.curve,
                        x: x.to_vec(),
                        y: y.to_vec(),
                    },
                ))
            }
            Err(error) => match surface(error, "ECDSA") {
                NativeFail::Unsupported => match &self.fallback {
                    Some(fallback) => fallback.sign(message, key_pair).await,
                    None => Err(self.unsupported("ECDSA signing")),
                },
                NativeFail::Error(error) => Err(error),
            },
        }
    }

    async fn verify(&self, message: &[u8], signature: &Signature) -> Result<bool> {
        let (x, y) = match signature.public_key() {
            PublicKey::Ec { curve, x, y } if *curve == self.curve => {
                (x.as_slice(), y.as_slice())
            }
            _ => {
                return Err(Error::param(
                    "Ecdsa.verify",
                    "signature key does not match the curve",
                ))
            }
        };
        if !self.available() {
            return match &self.fallback {
                Some(fallback) => fallback.verify(message, signature).await,
                None => Err(self.unsupported("ECDSA verification")),
            };
        }
        let weight = payload_weight(&[signature.bytes(), x, y, message]);
        let _permit = Arc::clone(&self.context.queue).acquire(weight).await;
        let args = CallArgs::new()
            .str("curve", self.curve.name())
            .bytes("data", message)
            .bytes("signature", signature.bytes())
            .bytes("x", x)
            .bytes("y", y);
        match self.context.channel.call("Ecdsa.verify", args).await {
            Ok(reply) => Ok(reply.require_bool("ok", "Ecdsa.verify")),
            Err(error) => match surface(error, "ECDSA") {
                NativeFail::Unsupported => match &self.fallback {
                    Some(fallback) => fallback.verify(message, signature).await,
                    None => Err(self.unsupported("ECDSA verification")),
                },
                NativeFail::Error(error) => Err(error),
            },
        }
    }
}
