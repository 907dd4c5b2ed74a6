//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! BoundListener (net::listener, std socket bound during startup)
//!     → server.rs (tokio or axum-server TLS acceptor)
//!     → application router or admin router
//!     → graceful drain on Shutdown
//! ```

pub mod server;

pub use server::{build_app_router, HttpServer, ServeError};
