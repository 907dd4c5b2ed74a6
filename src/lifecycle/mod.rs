//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Starting → lock attempt → guard (guard.rs) → assign ports → bind
//!         → Started   (lock released by the guard)
//!         → Failed    (lock released, or process exit via execution.rs)
//!
//! Shutdown (shutdown.rs):
//!     Signal (signals.rs) → Stopping → drain servers → Stopped
//! ```
//!
//! # Design Decisions
//! - Events are delivered synchronously on the emitting thread
//! - Exactly one cleanup hook per startup attempt
//! - Shutdown has timeout: forced exit after deadline

pub mod events;
pub mod execution;
pub mod guard;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use events::{LifecycleEvent, LifecycleEvents, LifecycleListener};
pub use execution::{
    build_strategy, ExecutionStrategy, FailureAction, FlagOnlyExecution, NoOpExecution,
    ProcessTerminate,
};
pub use guard::{InstalledHook, LockReleaseHook, StartupFailureGuard, TerminateOnFailureHook};
pub use shutdown::Shutdown;
pub use signals::wait_for_shutdown_signal;
pub use startup::{StartedService, Startup, StartupError};
