//! Port range and discovered port pair.

use serde::Serialize;
use std::fmt;
use std::ops::RangeInclusive;

use super::PortError;

/// Inclusive `[min, max]` interval of ports allowed for dynamic assignment.
///
/// Constructed once per startup attempt and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortRange {
    min: u16,
    max: u16,
}

impl PortRange {
    /// Validate and build a range. Requires `1 <= min < max`.
    pub fn new(min: u16, max: u16) -> Result<Self, PortError> {
        if min == 0 {
            return Err(PortError::InvalidRange {
                min,
                max,
                reason: "port 0 is reserved",
            });
        }
        if min >= max {
            return Err(PortError::InvalidRange {
                min,
                max,
                reason: "min must be lower than max",
            });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u16 {
        self.min
    }

    pub fn max(&self) -> u16 {
        self.max
    }

    /// Number of ports in the interval, both ends included.
    pub fn ports_in_range(&self) -> u32 {
        u32::from(self.max) - u32::from(self.min) + 1
    }

    /// Check budget for randomized discovery of a single port.
    pub fn max_attempts(&self) -> u32 {
        3 * self.ports_in_range()
    }

    pub fn contains(&self, port: u16) -> bool {
        port >= self.min && port <= self.max
    }

    /// Ascending iterator over every port in the range.
    pub fn ports(&self) -> RangeInclusive<u16> {
        self.min..=self.max
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Application and admin port chosen for one service instance.
///
/// `0` means the operating system picks the port at bind time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServicePorts {
    pub application_port: u16,
    pub admin_port: u16,
}

impl ServicePorts {
    pub fn new(application_port: u16, admin_port: u16) -> Self {
        Self {
            application_port,
            admin_port,
        }
    }

    /// Both ports left to the operating system.
    pub fn os_assigned() -> Self {
        Self::new(0, 0)
    }
}
