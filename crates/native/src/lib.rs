//! Native-channel delegation for the xcrypt library
//!
//! This crate connects the pure algorithm implementations to
//! platform-accelerated backends: the call contract for a native
//! execution channel, the size-weighted admission-control queue that
//! protects it from overload, static platform support detection, payload
//! size policies, and the per-algorithm delegating wrappers that pick a
//! native backend only when safe and beneficial.

#![forbid(unsafe_code)]

pub mod channel;
pub mod cipher;
pub mod context;
pub mod kx;
pub mod platform;
pub mod policy;
pub mod queue;
pub mod sign;
pub mod testkit;

// Re-export main types for convenience
pub use channel::{CallArgs, CallReply, CallValue, ChannelError, ChannelResult, NativeChannel};
pub use cipher::DelegatingCipher;
pub use context::NativeContext;
pub use kx::DelegatingKeyExchange;
pub use platform::{AlgorithmFamily, NativeSupport};
pub use policy::ChannelPolicy;
pub use queue::{payload_weight, AdmissionPermit, AdmissionQueue};
pub use sign::DelegatingSignature;

// Re-export the API error system instead of custom error types
pub use xcrypt_api::error::{Error, Result};
