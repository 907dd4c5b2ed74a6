//! Coordination service clients.
//!
//! # Data Flow
//! ```text
//! Coordinator::is_reachable()     (cheap check, no session)
//!     → Coordinator::connect()    → CoordinationClient
//!     → client.new_mutex(path)    → ClusterMutex
//!     → mutex.acquire(timeout) / mutex.release()
//!     → client.close()
//! ```
//!
//! # Backends
//! - file.rs: exclusive `flock(2)` on a lock file, shared by every process on the host
//! - memory.rs: in-process table, for instances embedded in one process and for tests
//!
//! # Design Decisions
//! - Calls block the caller; acquisition is bounded by its timeout only
//! - Mutual exclusion is enforced by the backend, never by the caller

#[cfg(unix)]
pub mod file;
pub mod memory;

#[cfg(unix)]
pub use file::FileLockCoordinator;
pub use memory::MemoryCoordinator;

use std::sync::Arc;
use std::time::Duration;

use crate::config::schema::StartupLockConfig;
use crate::lock::LockError;

/// Entry point to a coordination service.
pub trait Coordinator: Send + Sync {
    /// Whether the service currently answers. Must not block for long.
    fn is_reachable(&self) -> bool;

    /// Open a client session.
    fn connect(&self) -> Result<Box<dyn CoordinationClient>, LockError>;

    /// Backend name used in logs.
    fn name(&self) -> &'static str;
}

/// One client session with the coordination service.
pub trait CoordinationClient: Send {
    /// Create a handle on the named mutex. Does not acquire it.
    fn new_mutex(&self, path: &str) -> Result<Box<dyn ClusterMutex>, LockError>;

    /// End the session. Idempotent.
    fn close(&mut self);
}

/// Named mutual-exclusion lock held by at most one client at a time.
pub trait ClusterMutex: Send {
    /// Block up to `timeout`; `Ok(false)` when the wait expired.
    fn acquire(&mut self, timeout: Duration) -> Result<bool, LockError>;

    fn is_held(&self) -> bool;

    fn release(&mut self) -> Result<(), LockError>;
}

/// Build the host-scoped coordinator from config.
#[cfg(unix)]
pub fn build_coordinator(config: &StartupLockConfig) -> Arc<dyn Coordinator> {
    Arc::new(FileLockCoordinator::new(config.lock_dir.clone()))
}

/// Without `flock(2)` locks only exclude instances within this process.
#[cfg(not(unix))]
pub fn build_coordinator(config: &StartupLockConfig) -> Arc<dyn Coordinator> {
    tracing::warn!(
        lock_dir = %config.lock_dir.display(),
        "File locks unsupported on this platform, startup lock is process-local"
    );
    Arc::new(MemoryCoordinator::new())
}
