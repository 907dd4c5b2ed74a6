pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::lifecycle::StartedService;
use crate::ports::BoundPort;

/// Shared state for the admin connector.
#[derive(Clone)]
pub struct AdminState {
    pub service_name: Arc<str>,
    pub bound_ports: Arc<[BoundPort]>,
    pub lock_state: &'static str,
    pub started_at: Instant,
    pub api_key: Option<Arc<str>>,
    pub metrics: Option<PrometheusHandle>,
}

impl AdminState {
    pub fn new(
        service: &StartedService,
        api_key: Option<String>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            service_name: service.service_name.as_str().into(),
            bound_ports: service.bound_ports.as_slice().into(),
            lock_state: service.lock_state,
            started_at: Instant::now(),
            api_key: api_key.map(Into::into),
            metrics,
        }
    }
}

/// `/healthcheck` and `/metrics` are open; `/admin/*` requires the API key when one is set.
pub fn setup_admin_router(state: AdminState) -> Router {
    let protected = Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/ports", get(get_ports))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ));

    Router::new()
        .route("/healthcheck", get(healthcheck))
        .route("/metrics", get(get_metrics))
        .merge(protected)
        .with_state(state)
}
