//! Static platform support detection
//!
//! Whether a native backend exists for an algorithm family is a property
//! of the process, not of a call: it is computed once from target/feature
//! detection and never re-evaluated. Tests and embedders inject custom
//! instances instead of toggling globals.

use std::sync::OnceLock;

/// Algorithm families the native channel can accelerate
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum AlgorithmFamily {
    /// AES-CTR
    AesCtr,
    /// AES-GCM
    AesGcm,
    /// ChaCha20-Poly1305 AEAD
    Chacha20Poly1305,
    /// ECDSA over the NIST curves
    Ecdsa,
    /// ECDH over the NIST curves
    Ecdh,
}

impl AlgorithmFamily {
    /// Algorithm identifier used on the native channel; doubles as the
    /// key-handle cache token
    pub fn wire_id(&self) -> &'static str {
        match self {
            Self::AesCtr => "AES_CTR",
            Self::AesGcm => "AES_GCM",
            Self::Chacha20Poly1305 => "CHACHA20_POLY1305_AEAD",
            Self::Ecdsa => "ECDSA",
            Self::Ecdh => "ECDH",
        }
    }
}

/// Per-family availability of a native backend
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct NativeSupport {
    /// AES-CTR acceleration
    pub aes_ctr: bool,
    /// AES-GCM acceleration
    pub aes_gcm: bool,
    /// ChaCha20-Poly1305 acceleration
    pub chacha20_poly1305: bool,
    /// ECDSA acceleration
    pub ecdsa: bool,
    /// ECDH acceleration
    pub ecdh: bool,
}

impl NativeSupport {
    /// No native backend for anything; delegating wrappers become pure
    /// pass-throughs to their fallbacks
    pub const NONE: Self = Self {
        aes_ctr: false,
        aes_gcm: false,
        chacha20_poly1305: false,
        ecdsa: false,
        ecdh: false,
    };

    /// Every family natively backed; used with in-process channels
    pub const ALL: Self = Self {
        aes_ctr: true,
        aes_gcm: true,
        chacha20_poly1305: true,
        ecdsa: true,
        ecdh: true,
    };

    /// The process-wide detection result, computed once
    pub fn detect() -> &'static Self {
        static DETECTED: OnceLock<NativeSupport> = OnceLock::new();
        DETECTED.get_or_init(Self::probe)
    }

    fn probe() -> Self {
        if cfg!(any(target_os = "macos", target_os = "ios")) {
            // CryptoKit covers the AEADs and the NIST curves.
            Self {
                aes_ctr: false,
                aes_gcm: true,
                chacha20_poly1305: true,
                ecdsa: true,
                ecdh: true,
            }
        } else if cfg!(target_os = "android") {
            Self {
                aes_ctr: true,
                aes_gcm: true,
                chacha20_poly1305: false,
                ecdsa: true,
                ecdh: true,
            }
        } else if cfg!(target_arch = "wasm32") {
            // Web Crypto: AES modes and the NIST curves, no ChaCha20.
            Self {
                aes_ctr: true,
                aes_gcm: true,
                chacha20_poly1305: false,
                ecdsa: true,
                ecdh: true,
            }
        } else {
            Self::NONE
        }
    }

    /// Whether the given family has a native backend
    pub fn supports(&self, family: AlgorithmFamily) -> bool {
        match family {
            AlgorithmFamily::AesCtr => self.aes_ctr,
            AlgorithmFamily::AesGcm => self.aes_gcm,
            AlgorithmFamily::Chacha20Poly1305 => self.chacha20_poly1305,
            AlgorithmFamily::Ecdsa => self.ecdsa,
            AlgorithmFamily::Ecdh => self.ecdh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_is_stable() {
        // Two calls observe the same instance.
        assert!(std::ptr::eq(NativeSupport::detect(), NativeSupport::detect()));
    }

    #[test]
    fn family_lookup_matches_fields() {
        let support = NativeSupport {
            aes_gcm: true,
            ..NativeSupport::NONE
        };
        assert!(support.supports(AlgorithmFamily::AesGcm));
        assert!(!support.supports(AlgorithmFamily::AesCtr));
        assert!(!support.supports(AlgorithmFamily::Ecdsa));
    }
}
