//! Startup orchestration.
//!
//! # Responsibilities
//! - Take the startup lock when ports are discovered dynamically
//! - Install the cleanup hook matching the lock outcome
//! - Assign ports and bind every connector while the lock is held
//! - Report `Started` (releasing the lock) or `Failed`
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners are bound here but served elsewhere; the lock only covers binding

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::events::{LifecycleEvent, LifecycleEvents};
use super::execution::{build_strategy, ExecutionStrategy};
use super::guard::StartupFailureGuard;
use crate::config::schema::{ServerConfig, ServiceConfig};
use crate::coordination::{build_coordinator, Coordinator};
use crate::lock::{
    DistributedStartupLock, LockAttemptResult, LockError, NotAttemptedReason, UnavailablePolicy,
};
use crate::net::{bind_all, BoundListener, ListenerError};
use crate::ports::{
    build_finder, AssignmentError, BoundPort, FreePortFinder, LocalPortCheck, PortAssigner,
    PortError, PortRange,
};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    #[error("startup lock required but not held: {0}")]
    LockRequired(LockError),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Everything the serving layer needs once startup succeeded.
#[derive(Debug)]
pub struct StartedService {
    pub service_name: String,
    /// Server configuration with the assigned ports applied.
    pub server: ServerConfig,
    /// Ports actually bound, OS-assigned ones resolved.
    pub bound_ports: Vec<BoundPort>,
    pub listeners: Vec<BoundListener>,
    /// Outcome of the lock attempt, as reported by `LockAttemptResult::state`.
    pub lock_state: &'static str,
}

/// One startup attempt for a service instance.
pub struct Startup {
    config: ServiceConfig,
    events: Arc<LifecycleEvents>,
    coordinator: Option<Arc<dyn Coordinator>>,
    strategy: Arc<dyn ExecutionStrategy>,
    finder: Option<Box<dyn FreePortFinder>>,
}

impl Startup {
    /// Coordinator and exit strategy are built from `config`.
    pub fn new(config: ServiceConfig, events: Arc<LifecycleEvents>) -> Self {
        let coordinator = config
            .startup_lock
            .enabled
            .then(|| build_coordinator(&config.startup_lock));
        let strategy = build_strategy(config.failure.action, config.failure.exit_code);

        Self {
            config,
            events,
            coordinator,
            strategy,
            finder: None,
        }
    }

    /// Use `coordinator` for the startup lock, enabling it.
    pub fn with_coordinator(mut self, coordinator: Arc<dyn Coordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn ExecutionStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Replace the finder built from `ports.strategy`.
    pub fn with_finder(mut self, finder: Box<dyn FreePortFinder>) -> Self {
        self.finder = Some(finder);
        self
    }

    pub fn start(self) -> Result<StartedService, StartupError> {
        let ports = &self.config.ports;
        let range = ports
            .range
            .map(|r| PortRange::new(r.min, r.max))
            .transpose()?;
        let finder = match self.finder {
            Some(finder) => finder,
            None => build_finder(ports.strategy, LocalPortCheck::new(check_host(ports.check_host.as_deref())?)),
        };

        self.events.emit(LifecycleEvent::Starting);

        let lock_config = &self.config.startup_lock;
        let lock = match &self.coordinator {
            Some(coordinator) => DistributedStartupLock::new(coordinator.clone())
                .with_unavailable_policy(lock_config.on_unavailable)
                .acquire(
                    &lock_config.path,
                    Duration::from_millis(lock_config.timeout_ms),
                    ports.assignment,
                    |held| tracing::debug!(lock_path = held.lock_path(), "Entering port assignment window"),
                ),
            None => LockAttemptResult::NotAttempted(NotAttemptedReason::Disabled),
        };
        let hook = StartupFailureGuard::install(&lock, &self.events, self.strategy.clone());
        tracing::debug!(lock_state = lock.state(), hook = ?hook, "Startup guard installed");

        let fail = |error: StartupError| {
            lock.release();
            metrics::counter!("portlock_startup_failures_total").increment(1);
            tracing::error!(error = %error, "Startup failed");
            self.events.emit(LifecycleEvent::Failed {
                reason: error.to_string(),
            });
            error
        };

        if let LockAttemptResult::AcquireFailed(error) = &lock {
            if lock_config.on_unavailable == UnavailablePolicy::FailClosed {
                return Err(fail(StartupError::LockRequired(error.clone())));
            }
        }

        let mut server = self.config.server.clone();
        let mut assigner = PortAssigner::new(ports.assignment, ports.security, range, finder.as_ref());
        if let Some(tls) = &ports.tls {
            assigner = assigner.with_credentials(tls.clone());
        }
        let assigned = assigner
            .assign_dynamic_ports(&mut server)
            .map_err(|e| fail(e.into()))?;
        tracing::debug!(assigned = ?assigned, "Ports assigned");

        let listeners = bind_all(&server).map_err(|e| fail(e.into()))?;
        let bound_ports: Vec<BoundPort> = listeners.iter().map(BoundListener::bound_port).collect();

        self.events.emit(LifecycleEvent::Started);
        tracing::info!(
            service = %self.config.service_name,
            ports = ?bound_ports.iter().map(|p| (p.port_type.to_string(), p.port)).collect::<Vec<_>>(),
            lock_state = lock.state(),
            "Service ports bound"
        );

        Ok(StartedService {
            service_name: self.config.service_name.clone(),
            server,
            bound_ports,
            listeners,
            lock_state: lock.state(),
        })
    }
}

fn check_host(host: Option<&str>) -> Result<IpAddr, StartupError> {
    match host {
        None => Ok(LocalPortCheck::default().host()),
        Some(host) => host
            .parse()
            .map_err(|_| StartupError::Configuration(format!("invalid check_host {host:?}"))),
    }
}
