//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a service
//! instance. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::lifecycle::execution::FailureAction;
use crate::lock::UnavailablePolicy;
use crate::ports::{FinderStrategy, PortAssignment, PortSecurity};

/// Root configuration for a service instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Name reported by the admin API and used in logs.
    pub service_name: String,

    /// Application and admin connectors.
    pub server: ServerConfig,

    /// Dynamic port discovery settings.
    pub ports: PortsConfig,

    /// Cross-process startup lock.
    pub startup_lock: StartupLockConfig,

    /// What to do when startup fails without the lock held.
    pub failure: FailureConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "portlock".to_string(),
            server: ServerConfig::default(),
            ports: PortsConfig::default(),
            startup_lock: StartupLockConfig::default(),
            failure: FailureConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

/// Network server configuration: the connectors each listener binds.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub application_connectors: Vec<ConnectorConfig>,
    pub admin_connectors: Vec<ConnectorConfig>,

    /// Seconds to drain in-flight requests on shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            application_connectors: vec![ConnectorConfig::http("0.0.0.0", 8080)],
            admin_connectors: vec![ConnectorConfig::http("0.0.0.0", 8081)],
            shutdown_grace_secs: 10,
        }
    }
}

/// A single listening socket, plaintext or TLS.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConnectorConfig {
    Http(HttpConnectorConfig),
    Https(HttpsConnectorConfig),
}

impl ConnectorConfig {
    pub fn http(bind_host: &str, port: u16) -> Self {
        ConnectorConfig::Http(HttpConnectorConfig {
            bind_host: bind_host.to_string(),
            port,
        })
    }

    pub fn https(bind_host: &str, port: u16, tls: TlsCredentials) -> Self {
        ConnectorConfig::Https(HttpsConnectorConfig {
            bind_host: bind_host.to_string(),
            port,
            tls,
        })
    }

    pub fn port(&self) -> u16 {
        match self {
            ConnectorConfig::Http(c) => c.port,
            ConnectorConfig::Https(c) => c.port,
        }
    }

    pub fn set_port(&mut self, port: u16) {
        match self {
            ConnectorConfig::Http(c) => c.port = port,
            ConnectorConfig::Https(c) => c.port = port,
        }
    }

    pub fn bind_host(&self) -> &str {
        match self {
            ConnectorConfig::Http(c) => &c.bind_host,
            ConnectorConfig::Https(c) => &c.bind_host,
        }
    }

    pub fn is_secure(&self) -> bool {
        matches!(self, ConnectorConfig::Https(_))
    }

    pub fn security(&self) -> PortSecurity {
        if self.is_secure() {
            PortSecurity::Secure
        } else {
            PortSecurity::NonSecure
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct HttpConnectorConfig {
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    #[serde(default)]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct HttpsConnectorConfig {
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    #[serde(default)]
    pub port: u16,
    pub tls: TlsCredentials,
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

/// Transport credentials carried by TLS connectors.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TlsCredentials {
    /// Certificate chain (PEM).
    pub cert_path: PathBuf,

    /// Private key (PEM).
    pub key_path: PathBuf,

    /// CA bundle (PEM) for verifying client certificates. No client auth when unset.
    #[serde(default)]
    pub trust_store_path: Option<PathBuf>,

    /// Protocol versions, e.g. "TLSv1.2", "TLSv1.3".
    #[serde(default = "default_protocols")]
    pub supported_protocols: Vec<String>,

    /// IANA cipher suite names. Empty keeps the provider defaults.
    #[serde(default)]
    pub supported_cipher_suites: Vec<String>,

    /// Refuse handshakes that carry no SNI host name.
    #[serde(default)]
    pub sni_required: bool,
}

fn default_protocols() -> Vec<String> {
    vec!["TLSv1.2".to_string(), "TLSv1.3".to_string()]
}

/// Dynamic port discovery settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PortsConfig {
    pub assignment: PortAssignment,
    pub security: PortSecurity,

    /// Allowed interval. Ports are left to the OS when unset.
    pub range: Option<RangeConfig>,

    pub strategy: FinderStrategy,

    /// Address checks bind to; unspecified when unset.
    pub check_host: Option<String>,

    /// Credentials for the TLS connectors built under `security = "secure"`.
    pub tls: Option<TlsCredentials>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct RangeConfig {
    pub min: u16,
    pub max: u16,
}

/// Startup lock settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StartupLockConfig {
    pub enabled: bool,

    /// Name of the cluster-wide mutex.
    pub path: String,

    /// Maximum time to wait for the lock, in milliseconds.
    pub timeout_ms: u64,

    pub on_unavailable: UnavailablePolicy,

    /// Directory holding lock files for the host-scoped coordinator.
    pub lock_dir: PathBuf,
}

impl Default for StartupLockConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: "/portlock/startup".to_string(),
            timeout_ms: 30_000,
            on_unavailable: UnavailablePolicy::default(),
            lock_dir: std::env::temp_dir().join("portlock"),
        }
    }
}

/// Process handling when startup fails without a lock.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FailureConfig {
    pub action: FailureAction,
    pub exit_code: i32,
}

impl Default for FailureConfig {
    fn default() -> Self {
        Self {
            action: FailureAction::Terminate,
            exit_code: 1,
        }
    }
}

/// Timeout configuration for served requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// "pretty" for development, "json" for production.
    pub log_format: String,

    /// Install the Prometheus recorder and expose `/metrics` on the admin port.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: true,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AdminConfig {
    /// Bearer token for `/admin/*`. Open when unset.
    pub api_key: Option<String>,
}
