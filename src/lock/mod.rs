//! Cross-process startup lock.
//!
//! # State Machine
//! ```text
//! START ──static ports──────────────▶ NotAttempted(StaticAssignment)
//!   │  ──coordinator unreachable────▶ NotAttempted(CoordinatorUnreachable)   (fail open)
//!   │                                 AcquireFailed(Unavailable)            (fail closed)
//!   │  ──acquired within timeout────▶ Acquired(HeldLock)
//!   └  ──timeout / client error─────▶ AcquireFailed(LockError)
//! ```
//!
//! One transition per `acquire` call. An `Acquired` result is released exactly
//! once, by whichever of the lifecycle hook or the explicit failure path gets
//! there first.
//!
//! # Design Decisions
//! - Lock problems are captured in the result, not returned as errors
//! - Release never fails; it logs and moves on

mod result;
mod startup;

pub use result::{HeldLock, LockAttemptResult, NotAttemptedReason};
pub use startup::DistributedStartupLock;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Failure to obtain or hold the startup lock.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LockError {
    #[error("coordination service unavailable: {0}")]
    Unavailable(String),

    #[error("timed out after {timeout:?} waiting for lock {path}")]
    Timeout { path: String, timeout: Duration },

    #[error("coordination client error: {0}")]
    Client(String),
}

/// What to do when the coordination service cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailablePolicy {
    /// Start without the lock.
    #[default]
    FailOpen,
    /// Refuse to start without the lock.
    FailClosed,
}
