//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → handed to lifecycle::Startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; assigned ports live in a copy owned by startup
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::ServiceConfig;
pub use schema::{ConnectorConfig, PortsConfig, ServerConfig, StartupLockConfig, TlsCredentials};
pub use validation::{validate_config, ValidationError};
