//! Coordinated dynamic-port startup for co-located service instances.
//!
//! Instances of a service sharing a host discover a free application/admin
//! port pair, bind it while holding a startup lock, and release the lock once
//! the ports are bound or startup fails.

pub mod admin;
pub mod config;
pub mod coordination;
pub mod http;
pub mod lifecycle;
pub mod lock;
pub mod net;
pub mod observability;
pub mod ports;
pub mod resilience;

pub use config::schema::ServiceConfig;
pub use lifecycle::{StartedService, Startup, StartupError};
pub use lock::{DistributedStartupLock, LockAttemptResult};
pub use ports::{PortAssigner, PortRange};
