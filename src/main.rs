//! portlock: coordinated dynamic-port startup for co-located service instances.
//!
//! # Architecture Overview
//!
//! ```text
//!   config (TOML)
//!       │
//!       ▼
//!   ┌────────────────────────── lifecycle::Startup ──────────────────────────┐
//!   │  Starting                                                              │
//!   │     │                                                                  │
//!   │     ▼                                                                  │
//!   │  lock::DistributedStartupLock ──▶ coordination (flock / in-memory)     │
//!   │     │                                                                  │
//!   │     ▼                                                                  │
//!   │  lifecycle::StartupFailureGuard (release hook | terminate hook)        │
//!   │     │                                                                  │
//!   │     ▼                                                                  │
//!   │  ports::PortAssigner ──▶ ports::finder ──▶ ports::availability         │
//!   │     │                                                                  │
//!   │     ▼                                                                  │
//!   │  net::bind_all ──▶ Started (lock released) | Failed                    │
//!   └────────────────────────────────────────────────────────────────────────┘
//!       │
//!       ▼
//!   http::HttpServer (application router)   admin router (/healthcheck, /metrics, /admin/*)
//!       │
//!       ▼
//!   SIGINT/SIGTERM → Stopping → drain → Stopped
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};

use portlock::admin::{setup_admin_router, AdminState};
use portlock::config::{load_config, ServiceConfig};
use portlock::http::{build_app_router, HttpServer, ServeError};
use portlock::lifecycle::{
    wait_for_shutdown_signal, LifecycleEvent, LifecycleEvents, Shutdown, Startup,
};
use portlock::observability::{init_logging, init_metrics};
use portlock::ports::PortType;

#[derive(Parser)]
#[command(name = "portlock")]
#[command(about = "Start a service on coordinated dynamic ports", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    init_logging(&config.observability)?;
    tracing::info!("portlock v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        service = %config.service_name,
        assignment = ?config.ports.assignment,
        security = %config.ports.security,
        startup_lock = config.startup_lock.enabled,
        "Configuration loaded"
    );

    let metrics = if config.observability.metrics_enabled {
        match init_metrics() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!(error = %e, "Failed to install metrics recorder");
                None
            }
        }
    } else {
        None
    };

    // Probing and lock waits block; keep them off the async workers.
    let events = Arc::new(LifecycleEvents::new());
    let startup = Startup::new(config.clone(), events.clone());
    let started = tokio::task::spawn_blocking(move || startup.start()).await??;

    let admin_router = setup_admin_router(AdminState::new(
        &started,
        config.admin.api_key.clone(),
        metrics,
    ));
    let app_router = build_app_router(
        &started.service_name,
        Duration::from_secs(config.timeouts.request_secs),
    );
    let grace = Duration::from_secs(started.server.shutdown_grace_secs);

    let shutdown = Shutdown::new();
    let mut servers = JoinSet::new();
    for bound in started.listeners {
        let router = match bound.port_type {
            PortType::Application => app_router.clone(),
            PortType::Admin => admin_router.clone(),
        };
        servers.spawn(HttpServer::new(router, grace).run(bound, shutdown.signalled()));
    }

    let outcome = tokio::select! {
        signal = wait_for_shutdown_signal() => {
            tracing::info!(signal, "Shutdown signal received");
            Ok(())
        }
        Some(result) = servers.join_next() => {
            let reason = match flatten(result) {
                Ok(()) => "server exited unexpectedly".to_string(),
                Err(reason) => reason,
            };
            tracing::error!(reason = %reason, "Server failed");
            events.emit(LifecycleEvent::Failed { reason: reason.clone() });
            Err(reason)
        }
    };

    events.emit(LifecycleEvent::Stopping);
    shutdown.trigger();

    let drain = async {
        while let Some(result) = servers.join_next().await {
            if let Err(reason) = flatten(result) {
                tracing::warn!(reason = %reason, "Server stopped with error");
            }
        }
    };
    if tokio::time::timeout(grace + Duration::from_secs(1), drain).await.is_err() {
        tracing::warn!(grace_secs = grace.as_secs(), "Shutdown grace period elapsed, aborting servers");
        servers.abort_all();
    }

    events.emit(LifecycleEvent::Stopped);
    tracing::info!("Shutdown complete");
    outcome.map_err(Into::into)
}

fn flatten(result: Result<Result<(), ServeError>, JoinError>) -> Result<(), String> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(format!("server task panicked or was cancelled: {e}")),
    }
}
