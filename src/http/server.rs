//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the application router
//! - Wire up middleware (tracing, request timeout)
//! - Serve a pre-bound listener, plaintext or with the TLS config loaded at bind time
//! - Drain in-flight requests on shutdown

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::net::BoundListener;

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone)]
struct AppState {
    service_name: Arc<str>,
}

#[derive(Serialize)]
struct ServiceInfo {
    service: String,
    version: &'static str,
}

/// Router for the application connector.
#[allow(deprecated)]
pub fn build_app_router(service_name: &str, request_timeout: Duration) -> Router {
    let state = AppState {
        service_name: service_name.into(),
    };

    Router::new()
        .route("/", get(service_info))
        .route("/ping", get(ping))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

async fn service_info(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: state.service_name.to_string(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn ping() -> &'static str {
    "pong"
}

/// Serves one bound connector until shutdown.
pub struct HttpServer {
    router: Router,
    grace: Duration,
}

impl HttpServer {
    pub fn new(router: Router, grace: Duration) -> Self {
        Self { router, grace }
    }

    /// Run the server on `bound` until `shutdown` resolves.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn run<F>(self, bound: BoundListener, shutdown: F) -> Result<(), ServeError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = bound.local_addr();
        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        tracing::info!(
            port_type = %bound.port_type,
            address = %addr,
            tls = bound.connector.is_secure(),
            "HTTP server starting"
        );

        match bound.tls {
            None => {
                let listener = tokio::net::TcpListener::from_std(bound.listener)?;
                axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown)
                    .await?;
            }
            Some(tls) => {
                let handle = axum_server::Handle::new();

                let drain = handle.clone();
                let grace = self.grace;
                tokio::spawn(async move {
                    shutdown.await;
                    drain.graceful_shutdown(Some(grace));
                });

                axum_server::from_tcp_rustls(bound.listener, tls)
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
        }

        tracing::info!(port_type = %bound.port_type, address = %addr, "HTTP server stopped");
        Ok(())
    }
}
