//! Outcome of one startup lock attempt.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

use super::LockError;
use crate::coordination::{ClusterMutex, CoordinationClient};

/// Why no lock was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotAttemptedReason {
    /// Static ports need no serialization.
    StaticAssignment,
    /// The coordination service failed the reachability check.
    CoordinatorUnreachable,
    /// No startup lock configured.
    Disabled,
}

/// Result of `DistributedStartupLock::acquire`.
#[derive(Debug, Clone)]
pub enum LockAttemptResult {
    NotAttempted(NotAttemptedReason),
    Acquired(HeldLock),
    AcquireFailed(LockError),
}

impl LockAttemptResult {
    pub fn is_acquired(&self) -> bool {
        matches!(self, LockAttemptResult::Acquired(_))
    }

    /// Label used in logs, metrics and the admin API.
    pub fn state(&self) -> &'static str {
        match self {
            LockAttemptResult::NotAttempted(_) => "not_attempted",
            LockAttemptResult::Acquired(_) => "acquired",
            LockAttemptResult::AcquireFailed(_) => "acquire_failed",
        }
    }

    /// Release the lock if this result holds one. Idempotent.
    pub fn release(&self) {
        if let LockAttemptResult::Acquired(held) = self {
            held.release();
        }
    }
}

struct Handles {
    client: Box<dyn CoordinationClient>,
    mutex: Box<dyn ClusterMutex>,
}

struct Inner {
    lock_path: String,
    handles: Mutex<Option<Handles>>,
}

/// A live startup lock: the mutex handle plus the client session it belongs to.
///
/// Clones share the same lock. The first `release` wins; later calls, from
/// any thread, do nothing.
#[derive(Clone)]
pub struct HeldLock {
    inner: Arc<Inner>,
}

impl HeldLock {
    pub(crate) fn new(
        lock_path: &str,
        client: Box<dyn CoordinationClient>,
        mutex: Box<dyn ClusterMutex>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                lock_path: lock_path.to_string(),
                handles: Mutex::new(Some(Handles { client, mutex })),
            }),
        }
    }

    pub fn lock_path(&self) -> &str {
        &self.inner.lock_path
    }

    /// Whether this handle still holds the lock.
    pub fn is_held(&self) -> bool {
        self.inner
            .handles
            .lock()
            .as_ref()
            .is_some_and(|h| h.mutex.is_held())
    }

    /// Release the mutex and close the session.
    ///
    /// Returns `true` only for the call that actually released. Errors are
    /// logged, never returned: release usually runs while unwinding another
    /// failure.
    pub fn release(&self) -> bool {
        let Some(mut handles) = self.inner.handles.lock().take() else {
            return false;
        };

        if handles.mutex.is_held() {
            if let Err(e) = handles.mutex.release() {
                tracing::warn!(
                    lock_path = %self.inner.lock_path,
                    error = %e,
                    "Failed to release startup lock"
                );
            }
        }
        handles.client.close();

        metrics::counter!("portlock_lock_releases_total").increment(1);
        tracing::info!(lock_path = %self.inner.lock_path, "Startup lock released");
        true
    }
}

impl fmt::Debug for HeldLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeldLock")
            .field("lock_path", &self.inner.lock_path)
            .field("held", &self.is_held())
            .finish()
    }
}
