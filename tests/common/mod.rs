//! Shared utilities for integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::net::TcpListener;
use std::sync::Arc;

use portlock::config::schema::{ConnectorConfig, ServerConfig, ServiceConfig};
use portlock::lifecycle::{FailureAction, LifecycleEvent, LifecycleListener};
use portlock::ports::{FreePortFinder, PortAssignment, PortError, PortRange, ServicePorts};

/// Config with one loopback connector per listener, ports left to the OS.
pub fn loopback_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.service_name = "it-service".to_string();
    config.server = ServerConfig {
        application_connectors: vec![ConnectorConfig::http("127.0.0.1", 0)],
        admin_connectors: vec![ConnectorConfig::http("127.0.0.1", 0)],
        shutdown_grace_secs: 1,
    };
    config.failure.action = FailureAction::Noop;
    config
}

/// Same as `loopback_config`, with dynamic ports in `min..=max`.
pub fn dynamic_config(min: u16, max: u16) -> ServiceConfig {
    let mut config = loopback_config();
    config.ports.assignment = PortAssignment::Dynamic;
    config.ports.range = Some(portlock::config::schema::RangeConfig { min, max });
    config.startup_lock.timeout_ms = 200;
    config
}

/// Two ports that were free a moment ago.
pub fn free_port_pair() -> (u16, u16) {
    let a = TcpListener::bind("127.0.0.1:0").unwrap();
    let b = TcpListener::bind("127.0.0.1:0").unwrap();
    (a.local_addr().unwrap().port(), b.local_addr().unwrap().port())
}

/// Finder returning a fixed answer, counting calls.
pub struct ScriptedFinder {
    answer: Result<ServicePorts, PortError>,
    pub calls: Arc<Mutex<u32>>,
}

impl ScriptedFinder {
    pub fn ports(application_port: u16, admin_port: u16) -> Self {
        Self {
            answer: Ok(ServicePorts::new(application_port, admin_port)),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn exhausted(range: PortRange) -> Self {
        Self {
            answer: Err(PortError::NoAvailablePort {
                range,
                reason: "scripted".to_string(),
            }),
            calls: Arc::new(Mutex::new(0)),
        }
    }
}

impl FreePortFinder for ScriptedFinder {
    fn find(&self, _range: &PortRange) -> Result<ServicePorts, PortError> {
        *self.calls.lock() += 1;
        self.answer.clone()
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Records every lifecycle event by its display name.
#[derive(Default)]
pub struct EventRecorder {
    events: Mutex<Vec<String>>,
}

impl EventRecorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn names(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

impl LifecycleListener for EventRecorder {
    fn on_event(&self, event: &LifecycleEvent) {
        let name = match event {
            LifecycleEvent::Failed { .. } => "failed".to_string(),
            other => other.to_string(),
        };
        self.events.lock().push(name);
    }
}
