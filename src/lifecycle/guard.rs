//! Lifecycle hooks that clean up after a startup attempt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::events::{LifecycleEvent, LifecycleEvents, LifecycleListener};
use super::execution::ExecutionStrategy;
use crate::lock::{HeldLock, LockAttemptResult};

/// Releases the startup lock on the first started, stopped or failed event.
#[derive(Debug)]
pub struct LockReleaseHook {
    lock: HeldLock,
}

impl LockReleaseHook {
    pub fn new(lock: HeldLock) -> Self {
        Self { lock }
    }
}

impl LifecycleListener for LockReleaseHook {
    fn on_event(&self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::Started | LifecycleEvent::Stopped | LifecycleEvent::Failed { .. } => {
                if self.lock.release() {
                    tracing::debug!(event = %event, lock_path = self.lock.lock_path(), "Released startup lock on lifecycle event");
                }
            }
            LifecycleEvent::Starting | LifecycleEvent::Stopping => {}
        }
    }
}

/// Exits the process when startup fails and no lock was there to serialize it.
///
/// Disarmed by `Started`: failures after a successful start go through the
/// normal shutdown path instead.
#[derive(Debug)]
pub struct TerminateOnFailureHook {
    strategy: Arc<dyn ExecutionStrategy>,
    armed: AtomicBool,
}

impl TerminateOnFailureHook {
    pub fn new(strategy: Arc<dyn ExecutionStrategy>) -> Self {
        Self {
            strategy,
            armed: AtomicBool::new(true),
        }
    }
}

impl LifecycleListener for TerminateOnFailureHook {
    fn on_event(&self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::Started => self.armed.store(false, Ordering::SeqCst),
            LifecycleEvent::Failed { reason } => {
                if self.armed.swap(false, Ordering::SeqCst) {
                    tracing::error!(reason = %reason, "Startup failed without startup lock");
                    self.strategy.exit();
                } else {
                    tracing::debug!(reason = %reason, "Failure after startup, terminate hook disarmed");
                }
            }
            LifecycleEvent::Starting | LifecycleEvent::Stopping | LifecycleEvent::Stopped => {}
        }
    }
}

/// Which hook `StartupFailureGuard::install` registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstalledHook {
    LockRelease,
    TerminateOnFailure,
}

pub struct StartupFailureGuard;

impl StartupFailureGuard {
    /// Register exactly one cleanup hook for this startup attempt.
    ///
    /// With the lock held the hook releases it on every terminal path. Without
    /// it, a failed startup exits through `strategy` instead of leaving a
    /// half-started instance that may conflict with a sibling.
    pub fn install(
        lock: &LockAttemptResult,
        events: &LifecycleEvents,
        strategy: Arc<dyn ExecutionStrategy>,
    ) -> InstalledHook {
        match lock {
            LockAttemptResult::Acquired(held) => {
                events.register(Arc::new(LockReleaseHook::new(held.clone())));
                InstalledHook::LockRelease
            }
            LockAttemptResult::NotAttempted(_) | LockAttemptResult::AcquireFailed(_) => {
                events.register(Arc::new(TerminateOnFailureHook::new(strategy)));
                InstalledHook::TerminateOnFailure
            }
        }
    }
}
