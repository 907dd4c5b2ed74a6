//! In-process coordinator.

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::{ClusterMutex, CoordinationClient, Coordinator};
use crate::lock::LockError;

#[derive(Debug, Default)]
struct Shared {
    /// Lock path -> holder client id.
    holders: Mutex<HashMap<String, Uuid>>,
    released: Condvar,
    unreachable: AtomicBool,
    acquisitions: AtomicU64,
    releases: AtomicU64,
    open_sessions: AtomicU64,
}

/// Lock table shared by every clone of the coordinator.
///
/// Excludes instances living in the same process only.
#[derive(Debug, Clone, Default)]
pub struct MemoryCoordinator {
    shared: Arc<Shared>,
}

/// Counters exposed for assertions and the admin API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    pub acquisitions: u64,
    pub releases: u64,
    pub open_sessions: u64,
}

impl MemoryCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the service going away or coming back.
    pub fn set_reachable(&self, reachable: bool) {
        self.shared.unreachable.store(!reachable, Ordering::SeqCst);
    }

    pub fn is_locked(&self, path: &str) -> bool {
        self.shared.holders.lock().contains_key(path)
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            acquisitions: self.shared.acquisitions.load(Ordering::SeqCst),
            releases: self.shared.releases.load(Ordering::SeqCst),
            open_sessions: self.shared.open_sessions.load(Ordering::SeqCst),
        }
    }
}

impl Coordinator for MemoryCoordinator {
    fn is_reachable(&self) -> bool {
        !self.shared.unreachable.load(Ordering::SeqCst)
    }

    fn connect(&self) -> Result<Box<dyn CoordinationClient>, LockError> {
        if !self.is_reachable() {
            return Err(LockError::Unavailable("memory coordinator offline".into()));
        }
        self.shared.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryClient {
            id: Uuid::new_v4(),
            shared: self.shared.clone(),
            closed: false,
        }))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

struct MemoryClient {
    id: Uuid,
    shared: Arc<Shared>,
    closed: bool,
}

impl CoordinationClient for MemoryClient {
    fn new_mutex(&self, path: &str) -> Result<Box<dyn ClusterMutex>, LockError> {
        if self.closed {
            return Err(LockError::Client("session closed".into()));
        }
        Ok(Box::new(MemoryMutex {
            path: path.to_string(),
            owner: self.id,
            shared: self.shared.clone(),
            held: false,
        }))
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.shared.open_sessions.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for MemoryClient {
    fn drop(&mut self) {
        self.close();
    }
}

struct MemoryMutex {
    path: String,
    owner: Uuid,
    shared: Arc<Shared>,
    held: bool,
}

impl ClusterMutex for MemoryMutex {
    fn acquire(&mut self, timeout: Duration) -> Result<bool, LockError> {
        if self.held {
            return Ok(true);
        }

        let deadline = Instant::now() + timeout;
        let mut holders = self.shared.holders.lock();
        loop {
            if !holders.contains_key(&self.path) {
                holders.insert(self.path.clone(), self.owner);
                self.held = true;
                self.shared.acquisitions.fetch_add(1, Ordering::SeqCst);
                return Ok(true);
            }
            if self
                .shared
                .released
                .wait_until(&mut holders, deadline)
                .timed_out()
                && holders.contains_key(&self.path)
            {
                return Ok(false);
            }
        }
    }

    fn is_held(&self) -> bool {
        self.held
    }

    fn release(&mut self) -> Result<(), LockError> {
        if !self.held {
            return Ok(());
        }
        let mut holders = self.shared.holders.lock();
        match holders.get(&self.path) {
            Some(owner) if *owner == self.owner => {
                holders.remove(&self.path);
                self.held = false;
                self.shared.releases.fetch_add(1, Ordering::SeqCst);
                self.shared.released.notify_all();
                Ok(())
            }
            _ => {
                self.held = false;
                Err(LockError::Client(format!("lock {} lost", self.path)))
            }
        }
    }
}

impl Drop for MemoryMutex {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
