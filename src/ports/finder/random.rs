//! Randomized port discovery.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

use super::FreePortFinder;
use crate::ports::availability::PortCheck;
use crate::ports::range::{PortRange, ServicePorts};
use crate::ports::PortError;

/// Samples ports uniformly from the range until the check reports one free.
///
/// Each slot (application, then admin) gets `range.max_attempts()` samples.
/// Sampling means two instances starting at the same moment are unlikely to
/// race for the same candidate, unlike a fixed scan order.
pub struct RandomFreePortFinder<P> {
    check: P,
    rng: Mutex<StdRng>,
}

impl<P: PortCheck> RandomFreePortFinder<P> {
    pub fn new(check: P) -> Self {
        Self {
            check,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic sampling, for tests.
    pub fn with_seed(check: P, seed: u64) -> Self {
        Self {
            check,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn pick(
        &self,
        range: &PortRange,
        claimed: &mut HashSet<u16>,
        slot: &str,
    ) -> Result<u16, PortError> {
        let mut rng = self.rng.lock();
        for _ in 0..range.max_attempts() {
            let candidate = rng.gen_range(range.min()..=range.max());
            if claimed.contains(&candidate) {
                continue;
            }
            if self.check.is_available(candidate) {
                claimed.insert(candidate);
                return Ok(candidate);
            }
        }

        Err(PortError::NoAvailablePort {
            range: *range,
            reason: format!(
                "no open {} port after {} attempts",
                slot,
                range.max_attempts()
            ),
        })
    }
}

impl<P: PortCheck> FreePortFinder for RandomFreePortFinder<P> {
    fn find(&self, range: &PortRange) -> Result<ServicePorts, PortError> {
        let mut claimed = HashSet::with_capacity(2);
        let application_port = self.pick(range, &mut claimed, "application")?;
        let admin_port = self.pick(range, &mut claimed, "admin")?;

        tracing::debug!(
            range = %range,
            application_port,
            admin_port,
            "Random finder picked ports"
        );
        Ok(ServicePorts::new(application_port, admin_port))
    }

    fn name(&self) -> &'static str {
        "random"
    }
}
