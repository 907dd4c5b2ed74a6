//! Local port availability checking.

use std::net::{IpAddr, Ipv4Addr, TcpListener};

/// Point-in-time check whether a local port can be bound.
pub trait PortCheck: Send + Sync {
    fn is_available(&self, port: u16) -> bool;
}

impl<F> PortCheck for F
where
    F: Fn(u16) -> bool + Send + Sync,
{
    fn is_available(&self, port: u16) -> bool {
        self(port)
    }
}

/// Checks by binding a TCP listener on `host` and dropping it immediately.
#[derive(Debug, Clone)]
pub struct LocalPortCheck {
    host: IpAddr,
}

impl LocalPortCheck {
    pub fn new(host: IpAddr) -> Self {
        Self { host }
    }

    pub fn host(&self) -> IpAddr {
        self.host
    }
}

impl Default for LocalPortCheck {
    fn default() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }
}

impl PortCheck for LocalPortCheck {
    fn is_available(&self, port: u16) -> bool {
        let available = TcpListener::bind((self.host, port)).is_ok();
        metrics::counter!(
            "portlock_port_checks_total",
            "available" => if available { "true" } else { "false" }
        )
        .increment(1);
        tracing::trace!(port, host = %self.host, available, "Checked port");
        available
    }
}
