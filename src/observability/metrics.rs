//! Metrics collection and exposition.
//!
//! # Metrics
//! - `portlock_port_checks_total` (counter): checks by `available`
//! - `portlock_lock_attempts_total` (counter): lock attempts by `outcome`
//! - `portlock_lock_wait_seconds` (histogram): time spent acquiring the lock
//! - `portlock_lock_releases_total` (counter): releases that freed a held lock
//! - `portlock_startup_failures_total` (counter): startups ending in `Failed`
//!
//! # Design Decisions
//! - Metric updates go through the `metrics` facade at the call site
//! - The Prometheus recorder is rendered by the admin router, no extra listener

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder and describe the crate's metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe();
    tracing::debug!("Prometheus recorder installed");
    Ok(handle)
}

fn describe() {
    ::metrics::describe_counter!(
        "portlock_port_checks_total",
        "Port availability checks, labelled by result"
    );
    ::metrics::describe_counter!(
        "portlock_lock_attempts_total",
        "Startup lock attempts, labelled by outcome"
    );
    ::metrics::describe_histogram!(
        "portlock_lock_wait_seconds",
        ::metrics::Unit::Seconds,
        "Time spent waiting for the startup lock"
    );
    ::metrics::describe_counter!(
        "portlock_lock_releases_total",
        "Startup locks released"
    );
    ::metrics::describe_counter!(
        "portlock_startup_failures_total",
        "Startup attempts that failed"
    );
}
