use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::AdminState;
use crate::ports::BoundPort;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub service: String,
    pub lock_state: &'static str,
    pub uptime_secs: u64,
}

pub async fn healthcheck() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        service: state.service_name.to_string(),
        lock_state: state.lock_state,
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

pub async fn get_ports(State(state): State<AdminState>) -> Json<Vec<BoundPort>> {
    Json(state.bound_ports.to_vec())
}

pub async fn get_metrics(State(state): State<AdminState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{PortSecurity, PortType};
    use std::sync::Arc;
    use std::time::Instant;

    fn state() -> AdminState {
        AdminState {
            service_name: "orders".into(),
            bound_ports: Arc::from(vec![BoundPort {
                port_type: PortType::Application,
                security: PortSecurity::NonSecure,
                port: 9004,
            }]),
            lock_state: "acquired",
            started_at: Instant::now(),
            api_key: None,
            metrics: None,
        }
    }

    #[tokio::test]
    async fn test_status_reports_service_and_lock() {
        let Json(status) = get_status(State(state())).await;
        assert_eq!(status.service, "orders");
        assert_eq!(status.lock_state, "acquired");
        assert_eq!(status.status, "operational");
    }

    #[tokio::test]
    async fn test_ports_lists_bound_ports() {
        let Json(ports) = get_ports(State(state())).await;
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].port, 9004);
    }

    #[tokio::test]
    async fn test_metrics_disabled_is_not_found() {
        let response = get_metrics(State(state())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
