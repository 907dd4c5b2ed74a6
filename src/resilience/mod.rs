//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Lock acquisition against a busy mutex:
//!     → try once
//!     → backoff.rs (jittered exponential delay, capped at the remaining deadline)
//!     → try again until the deadline passes
//! ```
//!
//! # Design Decisions
//! - Every wait has a deadline; nothing polls forever
//! - Jittered backoff keeps instances started together from polling in lockstep

pub mod backoff;
