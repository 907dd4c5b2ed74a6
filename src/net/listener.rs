//! Binding of configured connectors.
//!
//! # Responsibilities
//! - Resolve each connector's bind address
//! - Bind a non-blocking std listener, ready to hand to tokio or axum-server
//! - Report the port actually bound (connectors configured with port 0)
//! - Load TLS credentials for secure connectors, so bad certificates fail startup

use axum_server::tls_rustls::RustlsConfig;
use std::fmt;
use std::net::{IpAddr, SocketAddr, TcpListener};

use super::tls::{load_tls_config, TlsError};
use crate::config::schema::{ConnectorConfig, ServerConfig};
use crate::ports::{BoundPort, PortType};

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Bind host is not an IP address.
    Address { host: String },
    /// Failed to bind to address.
    Bind {
        port_type: PortType,
        addr: SocketAddr,
        source: std::io::Error,
    },
    /// TLS credentials of a secure connector could not be loaded.
    Tls { port_type: PortType, source: TlsError },
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Address { host } => write!(f, "Invalid bind host: {}", host),
            ListenerError::Bind {
                port_type,
                addr,
                source,
            } => write!(f, "Failed to bind {} connector on {}: {}", port_type, addr, source),
            ListenerError::Tls { port_type, source } => {
                write!(f, "Failed to load TLS for {} connector: {}", port_type, source)
            }
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Address { .. } => None,
            ListenerError::Bind { source, .. } => Some(source),
            ListenerError::Tls { source, .. } => Some(source),
        }
    }
}

/// A connector together with the socket bound for it.
pub struct BoundListener {
    pub port_type: PortType,
    pub connector: ConnectorConfig,
    pub listener: TcpListener,
    /// Loaded server config for secure connectors.
    pub tls: Option<RustlsConfig>,
    local_addr: SocketAddr,
}

impl fmt::Debug for BoundListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundListener")
            .field("port_type", &self.port_type)
            .field("local_addr", &self.local_addr)
            .field("tls", &self.tls.is_some())
            .finish()
    }
}

impl BoundListener {
    /// Address actually bound; differs from the connector when its port was 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn bound_port(&self) -> BoundPort {
        BoundPort {
            port_type: self.port_type,
            security: self.connector.security(),
            port: self.local_addr.port(),
        }
    }
}

/// Bind every application connector, then every admin connector.
///
/// Sockets bound before a failure are closed when the partial result is dropped.
pub fn bind_all(server: &ServerConfig) -> Result<Vec<BoundListener>, ListenerError> {
    let application = server
        .application_connectors
        .iter()
        .map(|c| (PortType::Application, c));
    let admin = server.admin_connectors.iter().map(|c| (PortType::Admin, c));

    application
        .chain(admin)
        .map(|(port_type, connector)| bind(port_type, connector))
        .collect()
}

pub fn bind(port_type: PortType, connector: &ConnectorConfig) -> Result<BoundListener, ListenerError> {
    let host: IpAddr = connector
        .bind_host()
        .parse()
        .map_err(|_| ListenerError::Address {
            host: connector.bind_host().to_string(),
        })?;
    let addr = SocketAddr::new(host, connector.port());

    let tls = match connector {
        ConnectorConfig::Https(https) => Some(
            load_tls_config(&https.tls).map_err(|source| ListenerError::Tls { port_type, source })?,
        ),
        ConnectorConfig::Http(_) => None,
    };

    let listener = TcpListener::bind(addr)
        .and_then(|l| l.set_nonblocking(true).map(|_| l))
        .map_err(|source| ListenerError::Bind {
            port_type,
            addr,
            source,
        })?;

    let local_addr = listener.local_addr().unwrap_or(addr);
    tracing::info!(
        port_type = %port_type,
        address = %local_addr,
        tls = connector.is_secure(),
        "Listener bound"
    );

    Ok(BoundListener {
        port_type,
        connector: connector.clone(),
        listener,
        tls,
        local_addr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binds_os_assigned_ports() {
        let server = ServerConfig {
            application_connectors: vec![ConnectorConfig::http("127.0.0.1", 0)],
            admin_connectors: vec![ConnectorConfig::http("127.0.0.1", 0)],
            shutdown_grace_secs: 1,
        };

        let bound = bind_all(&server).unwrap();
        assert_eq!(bound.len(), 2);
        assert_eq!(bound[0].port_type, PortType::Application);
        assert_eq!(bound[1].port_type, PortType::Admin);
        assert_ne!(bound[0].bound_port().port, 0);
        assert_ne!(bound[0].local_addr().port(), bound[1].local_addr().port());
    }

    #[test]
    fn test_port_in_use_is_a_bind_error() {
        let taken = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let err = bind(PortType::Admin, &ConnectorConfig::http("127.0.0.1", port)).unwrap_err();
        assert!(matches!(
            err,
            ListenerError::Bind {
                port_type: PortType::Admin,
                ..
            }
        ));
        assert!(err.to_string().contains("admin connector"));
    }

    #[test]
    fn test_unreadable_tls_credentials_fail_binding() {
        let credentials = crate::config::schema::TlsCredentials {
            cert_path: "/nonexistent/cert.pem".into(),
            key_path: "/nonexistent/key.pem".into(),
            trust_store_path: None,
            supported_protocols: vec!["TLSv1.3".to_string()],
            supported_cipher_suites: Vec::new(),
            sni_required: false,
        };

        let err = bind(
            PortType::Application,
            &ConnectorConfig::https("127.0.0.1", 0, credentials),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ListenerError::Tls {
                port_type: PortType::Application,
                source: TlsError::Io { .. },
            }
        ));
        assert!(err.to_string().contains("application connector"));
    }

    #[test]
    fn test_plain_connectors_carry_no_tls() {
        let bound = bind(PortType::Admin, &ConnectorConfig::http("127.0.0.1", 0)).unwrap();
        assert!(bound.tls.is_none());
    }

    #[test]
    fn test_rejects_hostnames() {
        let err = bind(PortType::Application, &ConnectorConfig::http("localhost", 0)).unwrap_err();
        assert!(matches!(err, ListenerError::Address { .. }));
    }
}
