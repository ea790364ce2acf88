//! Native execution channel contract
//!
//! A call is identified by an operation name plus a mapping of named
//! byte-array/primitive arguments; a successful response is a mapping
//! with the result under a documented key. Failures carry a
//! machine-readable code from a closed set. The transport behind the
//! trait (platform plugin, browser Web Crypto bridge, OS keystore) is an
//! external collaborator; this crate only defines the boundary.

use core::fmt;
use std::collections::BTreeMap;

use async_trait::async_trait;

use xcrypt_api::NativeHandle;

/// A single named argument or result value crossing the channel
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum CallValue {
    /// Raw bytes (keys, nonces, payloads, tags)
    Bytes(Vec<u8>),
    /// Unsigned integer (handles, offsets)
    U64(u64),
    /// String identifier (algorithm and curve names)
    Str(String),
    /// Boolean result
    Bool(bool),
}

/// Named arguments for one channel call
#[derive(Clone, Default, Debug)]
pub struct CallArgs {
    values: BTreeMap<&'static str, CallValue>,
}

impl CallArgs {
    /// Start an empty argument map
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a byte argument
    pub fn bytes(mut self, name: &'static str, value: impl Into<Vec<u8>>) -> Self {
        self.values.insert(name, CallValue::Bytes(value.into()));
        self
    }

    /// Attach an integer argument
    pub fn u64(mut self, name: &'static str, value: u64) -> Self {
        self.values.insert(name, CallValue::U64(value));
        self
    }

    /// Attach a string argument
    pub fn str(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(name, CallValue::Str(value.into()));
        self
    }

    /// Read a byte argument
    pub fn get_bytes(&self, name: &str) -> Option<&[u8]> {
        match self.values.get(name) {
            Some(CallValue::Bytes(bytes)) => Some(bytes),
            _ => None,
        }
    }

    /// Read an integer argument
    pub fn get_u64(&self, name: &str) -> Option<u64> {
        match self.values.get(name) {
            Some(CallValue::U64(value)) => Some(*value),
            _ => None,
        }
    }

    /// Read a string argument
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(CallValue::Str(value)) => Some(value),
            _ => None,
        }
    }
}

/// Named results of one successful channel call
#[derive(Clone, Default, Debug)]
pub struct CallReply {
    values: BTreeMap<String, CallValue>,
}

impl CallReply {
    /// Start an empty reply map
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a byte result
    pub fn with_bytes(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.values.insert(name.into(), CallValue::Bytes(value.into()));
        self
    }

    /// Attach an integer result
    pub fn with_u64(mut self, name: impl Into<String>, value: u64) -> Self {
        self.values.insert(name.into(), CallValue::U64(value));
        self
    }

    /// Attach a boolean result
    pub fn with_bool(mut self, name: impl Into<String>, value: bool) -> Self {
        self.values.insert(name.into(), CallValue::Bool(value));
        self
    }

    /// Read a byte result
    pub fn bytes(&self, name: &str) -> Option<&[u8]> {
        match self.values.get(name) {
            Some(CallValue::Bytes(bytes)) => Some(bytes),
            _ => None,
        }
    }

    /// Read an integer result
    pub fn u64(&self, name: &str) -> Option<u64> {
        match self.values.get(name) {
            Some(CallValue::U64(value)) => Some(*value),
            _ => None,
        }
    }

    /// Read a boolean result
    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(CallValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    /// Read a byte result that the contract requires to be present
    ///
    /// A missing or mistyped key means the binding violated the call
    /// contract; that is a defect, not an input error, and must not be
    /// silently tolerated.
    pub fn require_bytes(&self, name: &str, operation: &str) -> &[u8] {
        match self.bytes(name) {
            Some(bytes) => bytes,
            None => {
                tracing::error!(operation, key = name, "native reply is missing a required key");
                panic!(
                    "native channel reply for '{}' is missing required key '{}'",
                    operation, name
                );
            }
        }
    }

    /// Read an integer result that the contract requires to be present
    pub fn require_u64(&self, name: &str, operation: &str) -> u64 {
        match self.u64(name) {
            Some(value) => value,
            None => {
                tracing::error!(operation, key = name, "native reply is missing a required key");
                panic!(
                    "native channel reply for '{}' is missing required key '{}'",
                    operation, name
                );
            }
        }
    }

    /// Read a boolean result that the contract requires to be present
    pub fn require_bool(&self, name: &str, operation: &str) -> bool {
        match self.bool(name) {
            Some(value) => value,
            None => {
                tracing::error!(operation, key = name, "native reply is missing a required key");
                panic!(
                    "native channel reply for '{}' is missing required key '{}'",
                    operation, name
                );
            }
        }
    }
}

/// Machine-readable failure codes from the closed channel error set
#[derive(thiserror::Error, Clone, PartialEq, Eq, Debug)]
pub enum ChannelError {
    /// The backend does not implement the requested algorithm
    #[error("UNSUPPORTED_ALGORITHM: {0}")]
    UnsupportedAlgorithm(String),
    /// The backend rejected the authentication tag
    #[error("INCORRECT_MAC: {0}")]
    IncorrectMac(String),
    /// The backend found invalid block padding
    #[error("INCORRECT_PADDING: {0}")]
    IncorrectPadding(String),
    /// Transport-level failure (process boundary, serialization, ...)
    #[error("transport: {0}")]
    Transport(String),
}

impl ChannelError {
    /// The wire code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedAlgorithm(_) => "UNSUPPORTED_ALGORITHM",
            Self::IncorrectMac(_) => "INCORRECT_MAC",
            Self::IncorrectPadding(_) => "INCORRECT_PADDING",
            Self::Transport(_) => "TRANSPORT",
        }
    }
}

/// Result type for channel calls
pub type ChannelResult = Result<CallReply, ChannelError>;

/// The native execution channel
///
/// Implementations marshal one call across a process/thread/FFI boundary
/// and must not be invoked without holding an admission permit from the
/// [`crate::AdmissionQueue`]; the queue is the library's backpressure
/// mechanism for exactly this boundary.
#[async_trait]
pub trait NativeChannel: Send + Sync + fmt::Debug {
    /// Execute one named operation
    async fn call(&self, operation: &str, args: CallArgs) -> ChannelResult;
}

/// A handle freshly parsed from a reply
pub(crate) fn handle_from_reply(reply: &CallReply, operation: &str) -> NativeHandle {
    NativeHandle::new(reply.require_u64("handle", operation))
}
