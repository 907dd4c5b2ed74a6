//! Acquisition of the startup lock.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{HeldLock, LockAttemptResult, LockError, NotAttemptedReason, UnavailablePolicy};
use crate::coordination::{CoordinationClient, Coordinator};
use crate::ports::PortAssignment;

/// Serializes the discover-and-bind window across instances sharing a coordinator.
pub struct DistributedStartupLock {
    coordinator: Arc<dyn Coordinator>,
    on_unavailable: UnavailablePolicy,
}

impl DistributedStartupLock {
    pub fn new(coordinator: Arc<dyn Coordinator>) -> Self {
        Self {
            coordinator,
            on_unavailable: UnavailablePolicy::FailOpen,
        }
    }

    pub fn with_unavailable_policy(mut self, policy: UnavailablePolicy) -> Self {
        self.on_unavailable = policy;
        self
    }

    /// Try to take the lock at `lock_path`, waiting at most `timeout`.
    ///
    /// `on_acquired` runs once the lock is held, before the result is returned.
    pub fn acquire<F>(
        &self,
        lock_path: &str,
        timeout: Duration,
        assignment: PortAssignment,
        on_acquired: F,
    ) -> LockAttemptResult
    where
        F: FnOnce(&HeldLock),
    {
        let result = self.attempt(lock_path, timeout, assignment, on_acquired);
        metrics::counter!("portlock_lock_attempts_total", "outcome" => result.state())
            .increment(1);
        result
    }

    fn attempt<F>(
        &self,
        lock_path: &str,
        timeout: Duration,
        assignment: PortAssignment,
        on_acquired: F,
    ) -> LockAttemptResult
    where
        F: FnOnce(&HeldLock),
    {
        if assignment == PortAssignment::Static {
            tracing::debug!(lock_path, "Static ports, startup lock not needed");
            return LockAttemptResult::NotAttempted(NotAttemptedReason::StaticAssignment);
        }

        let backend = self.coordinator.name();
        if !self.coordinator.is_reachable() {
            return match self.on_unavailable {
                UnavailablePolicy::FailOpen => {
                    tracing::warn!(
                        lock_path,
                        backend,
                        "Coordination service unreachable, starting without startup lock"
                    );
                    LockAttemptResult::NotAttempted(NotAttemptedReason::CoordinatorUnreachable)
                }
                UnavailablePolicy::FailClosed => {
                    let error = LockError::Unavailable(format!("{backend} coordinator unreachable"));
                    tracing::warn!(lock_path, backend, error = %error, "Startup lock unavailable");
                    LockAttemptResult::AcquireFailed(error)
                }
            };
        }

        let mut client = match self.coordinator.connect() {
            Ok(client) => client,
            Err(error) => return failed(lock_path, error),
        };

        let mut mutex = match client.new_mutex(lock_path) {
            Ok(mutex) => mutex,
            Err(error) => return close_and_fail(client.as_mut(), lock_path, error),
        };

        tracing::info!(lock_path, backend, timeout_ms = timeout.as_millis() as u64, "Acquiring startup lock");
        let started = Instant::now();
        let acquired = mutex.acquire(timeout);
        metrics::histogram!("portlock_lock_wait_seconds").record(started.elapsed().as_secs_f64());

        match acquired {
            Ok(true) => {
                tracing::info!(
                    lock_path,
                    waited_ms = started.elapsed().as_millis() as u64,
                    "Startup lock acquired"
                );
                let held = HeldLock::new(lock_path, client, mutex);
                on_acquired(&held);
                LockAttemptResult::Acquired(held)
            }
            Ok(false) => {
                drop(mutex);
                let error = LockError::Timeout {
                    path: lock_path.to_string(),
                    timeout,
                };
                close_and_fail(client.as_mut(), lock_path, error)
            }
            Err(error) => {
                drop(mutex);
                close_and_fail(client.as_mut(), lock_path, error)
            }
        }
    }

    /// Release whatever `result` holds. Never fails.
    pub fn release(result: &LockAttemptResult) {
        result.release();
    }
}

fn close_and_fail(
    client: &mut dyn CoordinationClient,
    lock_path: &str,
    error: LockError,
) -> LockAttemptResult {
    client.close();
    failed(lock_path, error)
}

fn failed(lock_path: &str, error: LockError) -> LockAttemptResult {
    tracing::warn!(lock_path, error = %error, "Failed to acquire startup lock, continuing without it");
    LockAttemptResult::AcquireFailed(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::{ClusterMutex, MemoryCoordinator};
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PATH: &str = "/portlock/test";

    fn lock_on(coordinator: &MemoryCoordinator) -> DistributedStartupLock {
        DistributedStartupLock::new(Arc::new(coordinator.clone()))
    }

    #[test]
    fn test_static_assignment_never_contacts_coordinator() {
        let coordinator = MemoryCoordinator::new();
        let called = Cell::new(false);

        let result = lock_on(&coordinator).acquire(
            PATH,
            Duration::from_millis(10),
            PortAssignment::Static,
            |_| called.set(true),
        );

        assert!(matches!(
            result,
            LockAttemptResult::NotAttempted(NotAttemptedReason::StaticAssignment)
        ));
        assert!(!called.get());
        assert_eq!(coordinator.stats().acquisitions, 0);
        assert_eq!(coordinator.stats().open_sessions, 0);
    }

    #[test]
    fn test_unreachable_coordinator_fails_open() {
        let coordinator = MemoryCoordinator::new();
        coordinator.set_reachable(false);

        let result = lock_on(&coordinator).acquire(
            PATH,
            Duration::from_millis(10),
            PortAssignment::Dynamic,
            |_| {},
        );

        assert!(matches!(
            result,
            LockAttemptResult::NotAttempted(NotAttemptedReason::CoordinatorUnreachable)
        ));
    }

    #[test]
    fn test_unreachable_coordinator_fails_closed_when_configured() {
        let coordinator = MemoryCoordinator::new();
        coordinator.set_reachable(false);

        let result = lock_on(&coordinator)
            .with_unavailable_policy(UnavailablePolicy::FailClosed)
            .acquire(PATH, Duration::from_millis(10), PortAssignment::Dynamic, |_| {});

        assert!(matches!(
            result,
            LockAttemptResult::AcquireFailed(LockError::Unavailable(_))
        ));
    }

    #[test]
    fn test_acquire_runs_callback_and_holds_lock() {
        let coordinator = MemoryCoordinator::new();
        let seen = Cell::new(None);

        let result = lock_on(&coordinator).acquire(
            PATH,
            Duration::from_millis(10),
            PortAssignment::Dynamic,
            |held| seen.set(Some(held.lock_path().to_string())),
        );

        assert!(result.is_acquired());
        assert_eq!(seen.take().as_deref(), Some(PATH));
        assert!(coordinator.is_locked(PATH));

        DistributedStartupLock::release(&result);
        assert!(!coordinator.is_locked(PATH));
        assert_eq!(coordinator.stats().open_sessions, 0);
    }

    #[test]
    fn test_timeout_when_held_elsewhere() {
        let coordinator = MemoryCoordinator::new();
        let first = lock_on(&coordinator).acquire(
            PATH,
            Duration::from_millis(10),
            PortAssignment::Dynamic,
            |_| {},
        );
        assert!(first.is_acquired());

        let second = lock_on(&coordinator).acquire(
            PATH,
            Duration::from_millis(30),
            PortAssignment::Dynamic,
            |_| panic!("must not acquire"),
        );

        match second {
            LockAttemptResult::AcquireFailed(LockError::Timeout { path, timeout }) => {
                assert_eq!(path, PATH);
                assert_eq!(timeout, Duration::from_millis(30));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        // Failed attempt closed its own session; only the holder's remains.
        assert_eq!(coordinator.stats().open_sessions, 1);
        first.release();
    }

    #[test]
    fn test_release_is_idempotent() {
        let coordinator = MemoryCoordinator::new();
        let result = lock_on(&coordinator).acquire(
            PATH,
            Duration::from_millis(10),
            PortAssignment::Dynamic,
            |_| {},
        );
        let LockAttemptResult::Acquired(held) = &result else {
            panic!("lock not acquired");
        };

        assert!(held.release());
        assert!(!held.release());
        result.release();
        assert_eq!(coordinator.stats().releases, 1);
    }

    #[test]
    fn test_release_of_unacquired_result_is_noop() {
        LockAttemptResult::NotAttempted(NotAttemptedReason::Disabled).release();
        LockAttemptResult::AcquireFailed(LockError::Client("boom".into())).release();
    }

    /// Coordinator whose sessions fail at a chosen step.
    #[derive(Clone, Copy)]
    enum FailAt {
        NewMutex,
        Acquire,
    }

    struct BrokenCoordinator {
        fail_at: FailAt,
        closes: Arc<AtomicUsize>,
    }

    struct BrokenClient {
        fail_at: FailAt,
        closes: Arc<AtomicUsize>,
    }

    struct BrokenMutex;

    impl Coordinator for BrokenCoordinator {
        fn is_reachable(&self) -> bool {
            true
        }

        fn connect(&self) -> Result<Box<dyn CoordinationClient>, LockError> {
            Ok(Box::new(BrokenClient {
                fail_at: self.fail_at,
                closes: self.closes.clone(),
            }))
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    impl CoordinationClient for BrokenClient {
        fn new_mutex(&self, _path: &str) -> Result<Box<dyn ClusterMutex>, LockError> {
            match self.fail_at {
                FailAt::NewMutex => Err(LockError::Client("mutex rejected".into())),
                FailAt::Acquire => Ok(Box::new(BrokenMutex)),
            }
        }

        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl ClusterMutex for BrokenMutex {
        fn acquire(&mut self, _timeout: Duration) -> Result<bool, LockError> {
            Err(LockError::Client("session expired".into()))
        }

        fn is_held(&self) -> bool {
            false
        }

        fn release(&mut self) -> Result<(), LockError> {
            Ok(())
        }
    }

    fn acquire_with_broken(fail_at: FailAt) -> (LockAttemptResult, usize) {
        let closes = Arc::new(AtomicUsize::new(0));
        let coordinator = BrokenCoordinator {
            fail_at,
            closes: closes.clone(),
        };
        let called = Cell::new(false);

        let result = DistributedStartupLock::new(Arc::new(coordinator)).acquire(
            PATH,
            Duration::from_millis(10),
            PortAssignment::Dynamic,
            |_| called.set(true),
        );
        assert!(!called.get());
        (result, closes.load(Ordering::SeqCst))
    }

    #[test]
    fn test_acquire_error_closes_client_once() {
        let (result, closes) = acquire_with_broken(FailAt::Acquire);

        assert!(matches!(
            &result,
            LockAttemptResult::AcquireFailed(LockError::Client(msg)) if msg == "session expired"
        ));
        assert_eq!(closes, 1);
        result.release();
    }

    #[test]
    fn test_mutex_creation_error_closes_client_once() {
        let (result, closes) = acquire_with_broken(FailAt::NewMutex);

        assert!(matches!(
            &result,
            LockAttemptResult::AcquireFailed(LockError::Client(msg)) if msg == "mutex rejected"
        ));
        assert_eq!(closes, 1);
    }
}
