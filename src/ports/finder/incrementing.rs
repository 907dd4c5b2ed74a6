//! Ascending scan for the first two free ports.

use super::FreePortFinder;
use crate::ports::availability::PortCheck;
use crate::ports::range::{PortRange, ServicePorts};
use crate::ports::PortError;

/// Walks the range once from `min` to `max` and keeps the first two free ports.
///
/// The ports need not be adjacent.
pub struct IncrementingFreePortFinder<P> {
    check: P,
}

impl<P: PortCheck> IncrementingFreePortFinder<P> {
    pub fn new(check: P) -> Self {
        Self { check }
    }
}

impl<P: PortCheck> FreePortFinder for IncrementingFreePortFinder<P> {
    fn find(&self, range: &PortRange) -> Result<ServicePorts, PortError> {
        let mut free = Vec::with_capacity(2);
        for port in range.ports() {
            if self.check.is_available(port) {
                free.push(port);
                if free.len() == 2 {
                    break;
                }
            }
        }

        match free[..] {
            [application_port, admin_port] => Ok(ServicePorts::new(application_port, admin_port)),
            _ => Err(PortError::NoAvailablePort {
                range: *range,
                reason: format!("found {} open port(s), need two", free.len()),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "incrementing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_skips_busy_ports() {
        let range = PortRange::new(9000, 9005).unwrap();
        let finder = IncrementingFreePortFinder::new(|port: u16| port >= 9004);

        assert_eq!(finder.find(&range).unwrap(), ServicePorts::new(9004, 9005));
    }

    #[test]
    fn test_pair_need_not_be_adjacent() {
        let range = PortRange::new(9000, 9005).unwrap();
        let finder = IncrementingFreePortFinder::new(|port: u16| port == 9000 || port == 9005);

        assert_eq!(finder.find(&range).unwrap(), ServicePorts::new(9000, 9005));
    }

    #[test]
    fn test_single_linear_pass_when_exhausted() {
        let range = PortRange::new(9000, 9005).unwrap();
        let checks = Arc::new(AtomicU32::new(0));
        let counter = checks.clone();
        let finder = IncrementingFreePortFinder::new(move |port: u16| {
            counter.fetch_add(1, Ordering::SeqCst);
            port == 9002
        });

        let err = finder.find(&range).unwrap_err();
        assert!(err.to_string().contains("found 1 open port(s)"));
        assert_eq!(checks.load(Ordering::SeqCst), range.ports_in_range());
    }
}
