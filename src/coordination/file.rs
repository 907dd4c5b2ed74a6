//! Host-scoped coordinator backed by `flock(2)`.
//!
//! Every lock path maps to one file under the lock directory. The kernel drops
//! the lock when the holding process exits, so a crashed instance never leaves
//! a stale lock behind.

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::{ClusterMutex, CoordinationClient, Coordinator};
use crate::lock::LockError;
use crate::resilience::backoff::delay_until_deadline;

const POLL_BASE_MS: u64 = 10;
const POLL_MAX_MS: u64 = 250;

#[derive(Debug, Clone)]
pub struct FileLockCoordinator {
    lock_dir: PathBuf,
}

impl FileLockCoordinator {
    pub fn new(lock_dir: impl Into<PathBuf>) -> Self {
        Self {
            lock_dir: lock_dir.into(),
        }
    }

    pub fn lock_dir(&self) -> &PathBuf {
        &self.lock_dir
    }
}

impl Coordinator for FileLockCoordinator {
    fn is_reachable(&self) -> bool {
        match fs::create_dir_all(&self.lock_dir) {
            Ok(()) => self.lock_dir.is_dir(),
            Err(e) => {
                tracing::debug!(
                    lock_dir = %self.lock_dir.display(),
                    error = %e,
                    "Lock directory unusable"
                );
                false
            }
        }
    }

    fn connect(&self) -> Result<Box<dyn CoordinationClient>, LockError> {
        if !self.lock_dir.is_dir() {
            return Err(LockError::Unavailable(format!(
                "lock directory {} missing",
                self.lock_dir.display()
            )));
        }
        Ok(Box::new(FileLockClient {
            id: Uuid::new_v4(),
            lock_dir: self.lock_dir.clone(),
            closed: false,
        }))
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

struct FileLockClient {
    id: Uuid,
    lock_dir: PathBuf,
    closed: bool,
}

impl CoordinationClient for FileLockClient {
    fn new_mutex(&self, path: &str) -> Result<Box<dyn ClusterMutex>, LockError> {
        if self.closed {
            return Err(LockError::Client("session closed".into()));
        }
        Ok(Box::new(FileMutex {
            file_path: self.lock_dir.join(lock_file_name(path)),
            owner: self.id,
            held: None,
        }))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

struct FileMutex {
    file_path: PathBuf,
    owner: Uuid,
    held: Option<Flock<File>>,
}

impl FileMutex {
    fn open(&self) -> Result<File, LockError> {
        OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.file_path)
            .map_err(|e| {
                LockError::Client(format!("open {}: {}", self.file_path.display(), e))
            })
    }

    fn record_holder(&self, lock: &Flock<File>) {
        let mut file: &File = lock;
        let written = file
            .set_len(0)
            .and_then(|_| writeln!(file, "pid={} client={}", std::process::id(), self.owner));
        if let Err(e) = written {
            tracing::debug!(path = %self.file_path.display(), error = %e, "Could not record lock holder");
        }
    }
}

impl ClusterMutex for FileMutex {
    fn acquire(&mut self, timeout: Duration) -> Result<bool, LockError> {
        if self.held.is_some() {
            return Ok(true);
        }

        let deadline = Instant::now() + timeout;
        let mut attempt = 0;
        loop {
            match Flock::lock(self.open()?, FlockArg::LockExclusiveNonblock) {
                Ok(lock) => {
                    self.record_holder(&lock);
                    self.held = Some(lock);
                    return Ok(true);
                }
                Err((_, errno)) if errno == Errno::EWOULDBLOCK => {}
                Err((_, errno)) => {
                    return Err(LockError::Client(format!(
                        "flock {}: {}",
                        self.file_path.display(),
                        errno
                    )));
                }
            }

            attempt += 1;
            match delay_until_deadline(attempt, POLL_BASE_MS, POLL_MAX_MS, deadline) {
                Some(delay) => thread::sleep(delay),
                None => return Ok(false),
            }
        }
    }

    fn is_held(&self) -> bool {
        self.held.is_some()
    }

    fn release(&mut self) -> Result<(), LockError> {
        let Some(lock) = self.held.take() else {
            return Ok(());
        };
        lock.unlock().map(drop).map_err(|(_, errno)| {
            LockError::Client(format!("unlock {}: {}", self.file_path.display(), errno))
        })
    }
}

/// Map a lock path such as `/portlock/orders` to a flat file name.
///
/// `/` becomes `_`; `_` and every other byte outside `[A-Za-z0-9.-]` is
/// percent-encoded, so distinct paths never share a file. Leading and
/// trailing slashes are ignored.
fn lock_file_name(path: &str) -> String {
    let mut name = String::with_capacity(path.len() + 5);
    for c in path.trim_matches('/').chars() {
        match c {
            '/' => name.push('_'),
            c if c.is_ascii_alphanumeric() || c == '-' || c == '.' => name.push(c),
            c => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    name.push_str(&format!("%{byte:02X}"));
                }
            }
        }
    }
    if name.is_empty() {
        name.push('_');
    }
    name.push_str(".lock");
    name
}
