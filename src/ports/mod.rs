//! Port discovery and assignment subsystem.
//!
//! # Data Flow
//! ```text
//! PortsConfig
//!     → range.rs (validated [min, max] interval + attempt budget)
//!     → finder/ (Random | Incrementing | Adjacent, checking via availability.rs)
//!     → ServicePorts (application, admin)
//!     → assigner.rs (rewrite connectors in ServerConfig)
//!     → Vec<BoundPort>
//! ```
//!
//! # Design Decisions
//! - Availability is a point-in-time bind check; the result can go stale
//!   before the real bind, which is what the startup lock serializes
//! - Finders never hand out the same port twice within one call
//! - Probing is synchronous and sequential

pub mod assigner;
pub mod finder;
pub mod availability;
pub mod range;

pub use assigner::{AssignmentError, BoundPort, PortAssigner};
pub use finder::{build_finder, FinderStrategy, FreePortFinder};
pub use availability::{LocalPortCheck, PortCheck};
pub use range::{PortRange, ServicePorts};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Whether ports are discovered at startup or taken from the connectors as configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PortAssignment {
    #[default]
    Static,
    Dynamic,
}

/// Whether discovered ports are bound to TLS or plaintext connectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PortSecurity {
    Secure,
    #[default]
    NonSecure,
}

/// Which listener a port belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PortType {
    Application,
    Admin,
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortType::Application => write!(f, "application"),
            PortType::Admin => write!(f, "admin"),
        }
    }
}

impl fmt::Display for PortSecurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortSecurity::Secure => write!(f, "secure"),
            PortSecurity::NonSecure => write!(f, "non_secure"),
        }
    }
}

/// Errors from range construction and port discovery.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PortError {
    #[error("invalid port range {min}-{max}: {reason}")]
    InvalidRange {
        min: u16,
        max: u16,
        reason: &'static str,
    },

    #[error("no available port in range {range}: {reason}")]
    NoAvailablePort { range: PortRange, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enums_deserialize_from_snake_case() {
        #[derive(Deserialize)]
        struct Sample {
            assignment: PortAssignment,
            security: PortSecurity,
        }

        let parsed: Sample =
            toml::from_str("assignment = \"dynamic\"\nsecurity = \"non_secure\"").unwrap();
        assert_eq!(parsed.assignment, PortAssignment::Dynamic);
        assert_eq!(parsed.security, PortSecurity::NonSecure);
    }

    #[test]
    fn test_no_available_port_message_names_range() {
        let range = PortRange::new(9000, 9005).unwrap();
        let err = PortError::NoAvailablePort {
            range,
            reason: "no two adjacent open ports".into(),
        };
        assert_eq!(
            err.to_string(),
            "no available port in range 9000-9005: no two adjacent open ports"
        );
    }
}
