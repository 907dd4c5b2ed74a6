//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ServerConfig (ports already assigned)
//!     → listener.rs (bind one socket per connector, app first then admin)
//!     → tls.rs (rustls config for https connectors)
//!     → Hand off to http/ and admin/ for serving
//! ```
//!
//! # Design Decisions
//! - Binding happens inside the startup lock window; serving happens after
//! - Sockets are bound with std and converted for tokio when served
//! - A failed bind drops every socket bound before it

pub mod listener;
pub mod tls;

pub use listener::{bind_all, BoundListener, ListenerError};
