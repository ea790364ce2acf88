//! Size-weighted admission control for the native channel
//!
//! Native execution channels that marshal large payloads across a
//! process/thread boundary exhibit instability or unacceptable latency
//! under high concurrent byte volume. This queue bounds the aggregate
//! payload weight concurrently in flight: a caller estimates the byte
//! weight of its request, acquires a permit of that size, and suspends
//! until the admitted total plus the request fits under the configured
//! maximum. Wake order is strictly FIFO; it orders *admission*, not
//! completion.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

/// Sum of the byte lengths a request will marshal across the boundary
pub fn payload_weight(parts: &[&[u8]]) -> usize {
    parts.iter().map(|part| part.len()).sum()
}

struct Waiter {
    weight: usize,
    admit: oneshot::Sender<AdmissionPermit>,
}

struct Inner {
    admitted: usize,
    waiters: VecDeque<Waiter>,
}

/// A process-wide, size-weighted gate in front of a native channel
///
/// Pass one shared instance (via `Arc`) to every delegating constructor
/// that talks to the same channel.
pub struct AdmissionQueue {
    max_concurrent_size: usize,
    inner: Mutex<Inner>,
}

impl AdmissionQueue {
    /// Default weight bound; an empirical tuning starting point, not a
    /// contract. Re-tune per target platform.
    pub const DEFAULT_MAX_CONCURRENT_SIZE: usize = 8 * 1024 * 1024;

    /// Create a queue admitting at most `max_concurrent_size` bytes at once
    pub fn new(max_concurrent_size: usize) -> Arc<Self> {
        Arc::new(Self {
            max_concurrent_size,
            inner: Mutex::new(Inner {
                admitted: 0,
                waiters: VecDeque::new(),
            }),
        })
    }

    /// Create a queue with the default bound
    pub fn with_default_size() -> Arc<Self> {
        Self::new(Self::DEFAULT_MAX_CONCURRENT_SIZE)
    }

    /// The configured weight bound
    pub fn max_concurrent_size(&self) -> usize {
        self.max_concurrent_size
    }

    /// Currently admitted weight
    pub fn admitted(&self) -> usize {
        self.inner.lock().expect("admission queue mutex poisoned").admitted
    }

    /// Requests currently waiting for admission
    pub fn queued(&self) -> usize {
        self.inner
            .lock()
            .expect("admission queue mutex poisoned")
            .waiters
            .len()
    }

    // A request fits when it stays under the bound; an oversized request
    // is admitted only when nothing else is in flight, so the bound's
    // intent (bounded concurrent bytes) is preserved by serializing it.
    fn fits(&self, admitted: usize, weight: usize) -> bool {
        admitted + weight <= self.max_concurrent_size || admitted == 0
    }

    /// Acquire admission for a request of the given weight
    ///
    /// Consumes an `Arc` clone of the queue (the permit keeps it alive).
    /// Suspends until capacity is available. This is the only cancellable
    /// phase of a native call: dropping the returned future while queued
    /// abandons the request; once admitted, the permit must be dropped to
    /// release the weight.
    pub async fn acquire(self: Arc<Self>, weight: usize) -> AdmissionPermit {
        let receiver = {
            let mut inner = self.inner.lock().expect("admission queue mutex poisoned");
            if inner.waiters.is_empty() && self.fits(inner.admitted, weight) {
                inner.admitted += weight;
                tracing::trace!(weight, admitted = inner.admitted, "admission granted");
                None
            } else {
                let (admit, receiver) = oneshot::channel();
                inner.waiters.push_back(Waiter { weight, admit });
                tracing::trace!(weight, queued = inner.waiters.len(), "admission queued");
                Some(receiver)
            }
        };

        match receiver {
            None => AdmissionPermit {
                queue: self,
                weight,
            },
            Some(receiver) => match receiver.await {
                Ok(permit) => permit,
                // The sender is dropped without sending only if the queue
                // itself is torn down; hand back an inert permit.
                Err(_) => AdmissionPermit {
                    queue: self,
                    weight: 0,
                },
            },
        }
    }

    fn release(self: Arc<Self>, weight: usize) {
        // Permits whose receiver was abandoned while queued are collected
        // and dropped after the lock is released; their Drop re-enters
        // release.
        let mut abandoned = Vec::new();
        {
            let mut inner = self.inner.lock().expect("admission queue mutex poisoned");
            inner.admitted = inner.admitted.saturating_sub(weight);
            tracing::trace!(weight, admitted = inner.admitted, "admission released");

            while let Some(head) = inner.waiters.front() {
                if !self.fits(inner.admitted, head.weight) {
                    break;
                }
                let waiter = inner
                    .waiters
                    .pop_front()
                    .expect("non-empty wait list has a head");
                inner.admitted += waiter.weight;
                let permit = AdmissionPermit {
                    queue: Arc::clone(&self),
                    weight: waiter.weight,
                };
                if let Err(permit) = waiter.admit.send(permit) {
                    abandoned.push(permit);
                }
            }
        }
        drop(abandoned);
    }
}

impl std::fmt::Debug for AdmissionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionQueue")
            .field("max_concurrent_size", &self.max_concurrent_size)
            .field("admitted", &self.admitted())
            .field("queued", &self.queued())
            .finish()
    }
}

/// RAII admission: releases its weight when dropped
pub struct AdmissionPermit {
    queue: Arc<AdmissionQueue>,
    weight: usize,
}

impl AdmissionPermit {
    /// The weight this permit holds
    pub fn weight(&self) -> usize {
        self.weight
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        Arc::clone(&self.queue).release(self.weight);
    }
}

impl std::fmt::Debug for AdmissionPermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AdmissionPermit({})", self.weight)
    }
}
