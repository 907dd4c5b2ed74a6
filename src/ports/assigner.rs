//! Applies discovered ports to the server's connectors.

use serde::Serialize;
use thiserror::Error;

use super::finder::FreePortFinder;
use super::range::{PortRange, ServicePorts};
use super::{PortAssignment, PortError, PortSecurity, PortType};
use crate::config::schema::{ConnectorConfig, ServerConfig, TlsCredentials};

const DEFAULT_BIND_HOST: &str = "0.0.0.0";

/// A port the service ends up listening on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundPort {
    pub port_type: PortType,
    pub security: PortSecurity,
    pub port: u16,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssignmentError {
    #[error(transparent)]
    NoAvailablePort(#[from] PortError),

    #[error("secure dynamic port assignment requires TLS credentials")]
    MissingTlsCredentials,
}

/// Rewrites a `ServerConfig` so its connectors listen on discovered ports.
///
/// Under `NonSecure` only the first application and first admin connector are
/// touched; further connectors keep their configured ports. Under `Secure`
/// both connector lists are replaced by a single TLS connector each, which
/// discards any other connector configuration.
pub struct PortAssigner<'a> {
    assignment: PortAssignment,
    security: PortSecurity,
    range: Option<PortRange>,
    finder: &'a dyn FreePortFinder,
    credentials: Option<TlsCredentials>,
}

impl<'a> PortAssigner<'a> {
    pub fn new(
        assignment: PortAssignment,
        security: PortSecurity,
        range: Option<PortRange>,
        finder: &'a dyn FreePortFinder,
    ) -> Self {
        Self {
            assignment,
            security,
            range,
            finder,
            credentials: None,
        }
    }

    /// Credentials for the connectors built under `PortSecurity::Secure`.
    pub fn with_credentials(mut self, credentials: TlsCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn assign_dynamic_ports(
        &self,
        server: &mut ServerConfig,
    ) -> Result<Vec<BoundPort>, AssignmentError> {
        if self.assignment == PortAssignment::Static {
            return Ok(configured_ports(server));
        }

        if self.security == PortSecurity::Secure && self.credentials.is_none() {
            return Err(AssignmentError::MissingTlsCredentials);
        }

        let ports = match &self.range {
            Some(range) => self.finder.find(range)?,
            None => ServicePorts::os_assigned(),
        };

        tracing::info!(
            finder = self.finder.name(),
            range = ?self.range.map(|r| r.to_string()),
            application_port = ports.application_port,
            admin_port = ports.admin_port,
            security = %self.security,
            "Assigning dynamic ports"
        );

        match &self.credentials {
            Some(tls) if self.security == PortSecurity::Secure => {
                replace_with_secure(server, ports, tls);
            }
            _ => update_plaintext(server, ports),
        }

        Ok(vec![
            BoundPort {
                port_type: PortType::Application,
                security: self.security,
                port: ports.application_port,
            },
            BoundPort {
                port_type: PortType::Admin,
                security: self.security,
                port: ports.admin_port,
            },
        ])
    }
}

fn configured_ports(server: &ServerConfig) -> Vec<BoundPort> {
    let application = server
        .application_connectors
        .iter()
        .map(|c| (PortType::Application, c));
    let admin = server.admin_connectors.iter().map(|c| (PortType::Admin, c));

    application
        .chain(admin)
        .map(|(port_type, connector)| BoundPort {
            port_type,
            security: connector.security(),
            port: connector.port(),
        })
        .collect()
}

fn update_plaintext(server: &mut ServerConfig, ports: ServicePorts) {
    set_first_port(&mut server.application_connectors, ports.application_port);
    set_first_port(&mut server.admin_connectors, ports.admin_port);
}

fn set_first_port(connectors: &mut Vec<ConnectorConfig>, port: u16) {
    match connectors.first_mut() {
        Some(connector) => connector.set_port(port),
        None => connectors.push(ConnectorConfig::http(DEFAULT_BIND_HOST, port)),
    }
}

fn replace_with_secure(server: &mut ServerConfig, ports: ServicePorts, tls: &TlsCredentials) {
    let application_host = first_bind_host(&server.application_connectors);
    let admin_host = first_bind_host(&server.admin_connectors);

    server.application_connectors = vec![ConnectorConfig::https(
        &application_host,
        ports.application_port,
        tls.clone(),
    )];
    server.admin_connectors = vec![ConnectorConfig::https(
        &admin_host,
        ports.admin_port,
        tls.clone(),
    )];
}

fn first_bind_host(connectors: &[ConnectorConfig]) -> String {
    connectors
        .first()
        .map(|c| c.bind_host().to_string())
        .unwrap_or_else(|| DEFAULT_BIND_HOST.to_string())
}
