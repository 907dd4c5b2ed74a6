//! Several instances racing for the same startup lock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use portlock::coordination::{Coordinator, MemoryCoordinator};
use portlock::lock::{DistributedStartupLock, LockAttemptResult, LockError};
use portlock::ports::PortAssignment;

const INSTANCES: usize = 4;

/// Every instance must get the lock in turn, never two at once.
fn assert_serialized(coordinator: Arc<dyn Coordinator>) {
    let inside = Arc::new(AtomicUsize::new(0));
    let max_inside = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(INSTANCES));

    let handles: Vec<_> = (0..INSTANCES)
        .map(|_| {
            let coordinator = coordinator.clone();
            let inside = inside.clone();
            let max_inside = max_inside.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let result = DistributedStartupLock::new(coordinator).acquire(
                    "/it/contention",
                    Duration::from_secs(10),
                    PortAssignment::Dynamic,
                    |_| {},
                );
                assert!(result.is_acquired(), "instance timed out: {result:?}");

                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                inside.fetch_sub(1, Ordering::SeqCst);

                result.release();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(max_inside.load(Ordering::SeqCst), 1);
}

#[test]
fn test_memory_lock_serializes_instances() {
    let coordinator = MemoryCoordinator::new();
    assert_serialized(Arc::new(coordinator.clone()));
    assert_eq!(coordinator.stats().acquisitions, INSTANCES as u64);
    assert_eq!(coordinator.stats().open_sessions, 0);
}

#[cfg(unix)]
#[test]
fn test_file_lock_serializes_instances() {
    let dir = tempfile::tempdir().unwrap();
    assert_serialized(Arc::new(portlock::coordination::FileLockCoordinator::new(
        dir.path(),
    )));
}

#[cfg(unix)]
#[test]
fn test_file_lock_times_out_while_held() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator: Arc<dyn Coordinator> =
        Arc::new(portlock::coordination::FileLockCoordinator::new(dir.path()));

    let first = DistributedStartupLock::new(coordinator.clone()).acquire(
        "/it/held",
        Duration::from_millis(100),
        PortAssignment::Dynamic,
        |_| {},
    );
    assert!(first.is_acquired());

    let second = DistributedStartupLock::new(coordinator.clone()).acquire(
        "/it/held",
        Duration::from_millis(100),
        PortAssignment::Dynamic,
        |_| {},
    );
    assert!(matches!(
        second,
        LockAttemptResult::AcquireFailed(LockError::Timeout { .. })
    ));

    first.release();
    let third = DistributedStartupLock::new(coordinator).acquire(
        "/it/held",
        Duration::from_millis(100),
        PortAssignment::Dynamic,
        |_| {},
    );
    assert!(third.is_acquired());
    third.release();
}
