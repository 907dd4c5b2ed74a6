//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that the port range and dynamic TLS settings are usable
//! - Validate value ranges (timeouts > 0, hosts are IP addresses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::IpAddr;

use crate::config::schema::{ConnectorConfig, ServiceConfig};
use crate::ports::{PortAssignment, PortRange, PortSecurity};

/// A single semantic problem, located by its dotted field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.service_name.trim().is_empty() {
        errors.push(ValidationError::new("service_name", "must not be empty"));
    }

    validate_connectors("server.application_connectors", &config.server.application_connectors, &mut errors);
    validate_connectors("server.admin_connectors", &config.server.admin_connectors, &mut errors);

    let ports = &config.ports;
    if let Some(range) = ports.range {
        if let Err(e) = PortRange::new(range.min, range.max) {
            errors.push(ValidationError::new("ports.range", e.to_string()));
        }
    }
    if ports.assignment == PortAssignment::Dynamic
        && ports.security == PortSecurity::Secure
        && ports.tls.is_none()
    {
        errors.push(ValidationError::new(
            "ports.tls",
            "required when dynamic ports are secure",
        ));
    }
    if let Some(host) = &ports.check_host {
        if host.parse::<IpAddr>().is_err() {
            errors.push(ValidationError::new(
                "ports.check_host",
                format!("{host:?} is not an IP address"),
            ));
        }
    }

    let lock = &config.startup_lock;
    if lock.timeout_ms == 0 {
        errors.push(ValidationError::new("startup_lock.timeout_ms", "must be greater than 0"));
    }
    if lock.path.trim().is_empty() {
        errors.push(ValidationError::new("startup_lock.path", "must not be empty"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    match config.observability.log_format.as_str() {
        "pretty" | "json" => {}
        other => errors.push(ValidationError::new(
            "observability.log_format",
            format!("unknown format {other:?}, expected \"pretty\" or \"json\""),
        )),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_connectors(field: &str, connectors: &[ConnectorConfig], errors: &mut Vec<ValidationError>) {
    for (i, connector) in connectors.iter().enumerate() {
        if connector.bind_host().parse::<IpAddr>().is_err() {
            errors.push(ValidationError::new(
                format!("{field}[{i}].bind_host"),
                format!("{:?} is not an IP address", connector.bind_host()),
            ));
        }
    }
}
