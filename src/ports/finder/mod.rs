//! Free port finders.
//!
//! # Strategies
//! - Random: uniform sampling, spreads collisions across instances starting together
//! - Incrementing: first two free ports in ascending order
//! - Adjacent: first free `(p, p + 1)` pair in ascending order
//!
//! All strategies return distinct application and admin ports, or
//! `PortError::NoAvailablePort` once their check budget is spent.

pub mod adjacent;
pub mod incrementing;
pub mod random;

pub use adjacent::AdjacentFreePortFinder;
pub use incrementing::IncrementingFreePortFinder;
pub use random::RandomFreePortFinder;

use serde::{Deserialize, Serialize};

use super::availability::PortCheck;
use super::range::{PortRange, ServicePorts};
use super::PortError;

/// Strategy that picks an unused (application, admin) port pair from a range.
pub trait FreePortFinder: Send + Sync {
    fn find(&self, range: &PortRange) -> Result<ServicePorts, PortError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Finder selection as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinderStrategy {
    #[default]
    Random,
    Incrementing,
    Adjacent,
}

/// Build the configured finder around a check.
pub fn build_finder<P>(strategy: FinderStrategy, check: P) -> Box<dyn FreePortFinder>
where
    P: PortCheck + 'static,
{
    match strategy {
        FinderStrategy::Random => Box::new(RandomFreePortFinder::new(check)),
        FinderStrategy::Incrementing => Box::new(IncrementingFreePortFinder::new(check)),
        FinderStrategy::Adjacent => Box::new(AdjacentFreePortFinder::new(check)),
    }
}
