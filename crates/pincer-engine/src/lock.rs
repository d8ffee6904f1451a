//! Global execution lock.
//!
//! At most one cycle is in flight at any time. The application only
//! runs detection while the lock is free, and a cycle's guard returns
//! the lock exactly once when the cycle reaches a terminal state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Single-permit lock over cycle execution.
///
/// Thread-safe: shared across tasks via `Arc<ExecutionLock>`.
#[derive(Debug)]
pub struct ExecutionLock {
    active: AtomicBool,
}

impl ExecutionLock {
    /// Create a free lock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
        }
    }

    /// Check whether a cycle currently holds the lock.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Try to take the lock.
    ///
    /// Returns a guard on success, `None` while another cycle is in
    /// flight. The guard releases on drop, so the lock cannot stay
    /// held past the end of a cycle regardless of which path the
    /// cycle takes out.
    pub fn try_acquire(self: &Arc<Self>) -> Option<CycleGuard> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            debug!("Execution lock acquired");
            Some(CycleGuard {
                lock: Arc::clone(self),
            })
        } else {
            None
        }
    }

    fn release(&self) {
        if self
            .active
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            debug!("Execution lock released");
        } else {
            warn!("Execution lock released while already free");
        }
    }
}

impl Default for ExecutionLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds the execution lock for the lifetime of one cycle.
#[derive(Debug)]
pub struct CycleGuard {
    lock: Arc<ExecutionLock>,
}

impl CycleGuard {
    /// Release ahead of drop.
    pub fn release(self) {}
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.lock.release();
    }
}
