//! Single-slot latest-frame mailbox and the shared shutdown signal.
//!
//! One slot per sensor: producers overwrite the slot with their most recent
//! frame, the consumer reads whatever is current right before use. There is
//! no queue and no backpressure; if the consumer is slower than capture,
//! older frames are silently overwritten (last-writer-wins). Producers and
//! the consumer never rendezvous, so the two frames consumed together are
//! not guaranteed timestamp-synchronized.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Overwrite-on-write, read-latest mailbox. Cloning shares the slot.
#[derive(Debug)]
pub struct LatestSlot<T> {
    inner: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for LatestSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
        }
    }

    /// Replace the slot contents with a newer value.
    pub fn publish(&self, value: T) {
        *self.inner.lock().unwrap() = Some(value);
    }

    /// Remove and return the current value, leaving the slot empty.
    pub fn take(&self) -> Option<T> {
        self.inner.lock().unwrap().take()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_none()
    }
}

impl<T: Clone> LatestSlot<T> {
    /// Non-blocking read of the most recent value.
    pub fn latest(&self) -> Option<T> {
        self.inner.lock().unwrap().clone()
    }
}

/// Shared stop signal: raised once by whichever producer fails first,
/// observed by the other producer and the consumer. Never lowered.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    raised: Arc<AtomicBool>,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}
