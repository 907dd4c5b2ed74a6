//! Process exit strategies.
//!
//! Termination goes through a trait so tests can observe it without killing
//! the test runner.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub trait ExecutionStrategy: Send + Sync + fmt::Debug {
    fn exit(&self);
}

/// Ignores exit requests.
#[derive(Debug, Default)]
pub struct NoOpExecution;

impl ExecutionStrategy for NoOpExecution {
    fn exit(&self) {
        tracing::debug!("Exit requested, ignored");
    }
}

/// Records exit requests.
#[derive(Debug, Default)]
pub struct FlagOnlyExecution {
    requested: AtomicBool,
}

impl FlagOnlyExecution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exit_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

impl ExecutionStrategy for FlagOnlyExecution {
    fn exit(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }
}

/// Terminates the process with a fixed exit code.
#[derive(Debug)]
pub struct ProcessTerminate {
    exit_code: i32,
}

impl ProcessTerminate {
    pub fn new(exit_code: i32) -> Self {
        Self { exit_code }
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }
}

impl Default for ProcessTerminate {
    fn default() -> Self {
        Self::new(1)
    }
}

impl ExecutionStrategy for ProcessTerminate {
    fn exit(&self) {
        tracing::error!(exit_code = self.exit_code, "Terminating process after failed startup");
        std::process::exit(self.exit_code);
    }
}

/// Configured reaction to a startup failure without the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureAction {
    #[default]
    Terminate,
    Noop,
}

pub fn build_strategy(action: FailureAction, exit_code: i32) -> Arc<dyn ExecutionStrategy> {
    match action {
        FailureAction::Terminate => Arc::new(ProcessTerminate::new(exit_code)),
        FailureAction::Noop => Arc::new(NoOpExecution),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_only_records_request() {
        let strategy = FlagOnlyExecution::new();
        assert!(!strategy.exit_requested());

        strategy.exit();
        assert!(strategy.exit_requested());
    }

    #[test]
    fn test_build_strategy_maps_config() {
        let strategy = build_strategy(FailureAction::Noop, 3);
        strategy.exit();
        assert_eq!(format!("{strategy:?}"), "NoOpExecution");

        let strategy = build_strategy(FailureAction::Terminate, 3);
        assert_eq!(format!("{strategy:?}"), "ProcessTerminate { exit_code: 3 }");
    }
}
