//! Error type definitions for cryptographic operations
//!
//! One unified error type is shared across the workspace. Internal
//! consistency failures (a native backend returning a result whose shape
//! disagrees with the contract) are deliberately *not* represented here:
//! they indicate a broken binding and are raised as panics at the
//! delegation layer.

use core::fmt;
use std::borrow::Cow;

/// Primary error type for cryptographic operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// MAC verification failed; decryption was not attempted
    Authentication {
        /// MAC or AEAD algorithm that rejected the tag
        algorithm: &'static str,
    },

    /// Block-cipher unpadding found invalid padding
    Padding {
        /// Cipher whose unpadding failed
        algorithm: &'static str,
    },

    /// Operation is not available on this implementation or platform
    Unsupported {
        /// Operation that was requested
        operation: &'static str,
    },

    /// Length validation error with context
    InvalidLength {
        /// Context where the length error occurred
        context: &'static str,
        /// Expected length in bytes
        expected: usize,
        /// Actual length in bytes
        actual: usize,
    },

    /// Invalid parameter error
    InvalidParameter {
        /// Name of the invalid parameter
        context: &'static str,
        /// Reason why the parameter is invalid
        reason: Cow<'static, str>,
    },

    /// An incremental sink was fed after it was closed
    SinkClosed {
        /// Sink that rejected the input
        context: &'static str,
    },

    /// Key material extraction or derivation failed
    KeyMaterial {
        /// Context where extraction failed
        context: &'static str,
        /// Detailed error message
        message: String,
    },

    /// Fallback for errors from external collaborators
    Other {
        /// Context where the error occurred
        context: &'static str,
        /// Detailed error message
        message: String,
    },
}

/// Result type for cryptographic operations
pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    /// Shorthand to create an `InvalidParameter` error
    pub fn param<R: Into<Cow<'static, str>>>(context: &'static str, reason: R) -> Self {
        Error::InvalidParameter {
            context,
            reason: reason.into(),
        }
    }

    /// Shorthand to create an `Other` error
    pub fn other(context: &'static str, message: impl Into<String>) -> Self {
        Error::Other {
            context,
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication { algorithm } => {
                write!(f, "authentication failed for {}", algorithm)
            }
            Self::Padding { algorithm } => {
                write!(f, "invalid padding for {}", algorithm)
            }
            Self::Unsupported { operation } => {
                write!(f, "{} is not supported here", operation)
            }
            Self::InvalidLength {
                context,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "{}: invalid length (expected {}, got {})",
                    context, expected, actual
                )
            }
            Self::InvalidParameter { context, reason } => {
                write!(f, "invalid parameter '{}': {}", context, reason)
            }
            Self::SinkClosed { context } => {
                write!(f, "{}: sink is already closed", context)
            }
            Self::KeyMaterial { context, message } => {
                write!(f, "key material unavailable in {}: {}", context, message)
            }
            Self::Other { context, message } => {
                write!(f, "{}: {}", context, message)
            }
        }
    }
}

impl std::error::Error for Error {}

pub mod validate;
