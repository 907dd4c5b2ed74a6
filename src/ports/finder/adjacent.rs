//! Ascending scan for a pair of consecutive free ports.

use super::FreePortFinder;
use crate::ports::availability::PortCheck;
use crate::ports::range::{PortRange, ServicePorts};
use crate::ports::PortError;

/// Finds the lowest `p` such that both `p` and `p + 1` are free.
///
/// For deployments whose firewall rules assume the admin port directly
/// follows the application port. Every port is checked at most once.
pub struct AdjacentFreePortFinder<P> {
    check: P,
}

impl<P: PortCheck> AdjacentFreePortFinder<P> {
    pub fn new(check: P) -> Self {
        Self { check }
    }
}

impl<P: PortCheck> FreePortFinder for AdjacentFreePortFinder<P> {
    fn find(&self, range: &PortRange) -> Result<ServicePorts, PortError> {
        // Free port immediately below the current one, if any.
        let mut previous: Option<u16> = None;

        for port in range.ports() {
            if !self.check.is_available(port) {
                previous = None;
                continue;
            }
            if let Some(application_port) = previous {
                return Ok(ServicePorts::new(application_port, port));
            }
            previous = Some(port);
        }

        Err(PortError::NoAvailablePort {
            range: *range,
            reason: "no two adjacent open ports".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "adjacent"
    }
}
