//! Opaque handles to key material imported into a native backend

/// An opaque token identifying key material already imported into a
/// native execution channel
///
/// Handles are issued by the channel on import and carry no meaning
/// outside it. Caching one never extends the life of the native-side
/// object; a stale handle simply triggers a re-import.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NativeHandle(u64);

impl NativeHandle {
    /// Wrap a raw handle value issued by a native channel
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw handle value
    pub fn value(&self) -> u64 {
        self.0
    }
}
