//! The single shared cell holding the active data-plane target.

use std::sync::{Arc, Mutex};

use crate::net::Endpoint;

/// Shared handle to the active target endpoint, or `None` while no client
/// is connected.
///
/// This is the only mutable state the control and TX threads share. All
/// accesses are short lock-held critical sections; the lock is never held
/// across a network call. Writes are last-writer-wins: a repeated CONNECT
/// simply replaces the previous target.
#[derive(Debug, Clone, Default)]
pub struct TargetSlot {
    inner: Arc<Mutex<Option<Endpoint>>>,
}

impl TargetSlot {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the target with `endpoint`.
    pub fn set(&self, endpoint: Endpoint) {
        *self.lock() = Some(endpoint);
    }

    /// Clears the target, stopping transmission.
    pub fn clear(&self) {
        *self.lock() = None;
    }

    /// Returns the current target, if any.
    #[must_use]
    pub fn get(&self) -> Option<Endpoint> {
        *self.lock()
    }

    /// Locks the slot, taking the inner value if the mutex was poisoned.
    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Endpoint>> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
