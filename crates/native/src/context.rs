//! Shared native execution context

use std::sync::Arc;

use crate::channel::NativeChannel;
use crate::platform::NativeSupport;
use crate::queue::AdmissionQueue;

/// Everything a delegating wrapper needs to reach the native backend
///
/// Built once at startup and passed explicitly to delegating
/// constructors; there is no global singleton.
#[derive(Clone, Debug)]
pub struct NativeContext {
    /// The channel into native code
    pub channel: Arc<dyn NativeChannel>,
    /// The admission gate shared by every caller of that channel
    pub queue: Arc<AdmissionQueue>,
    /// Per-family backend availability
    pub support: NativeSupport,
}

impl NativeContext {
    /// Context with process-detected platform support
    pub fn new(channel: Arc<dyn NativeChannel>, queue: Arc<AdmissionQueue>) -> Self {
        Self {
            channel,
            queue,
            support: *NativeSupport::detect(),
        }
    }

    /// Context with explicitly injected support; for tests and embedders
    pub fn with_support(
        channel: Arc<dyn NativeChannel>,
        queue: Arc<AdmissionQueue>,
        support: NativeSupport,
    ) -> Self {
        Self {
            channel,
            queue,
            support,
        }
    }
}
