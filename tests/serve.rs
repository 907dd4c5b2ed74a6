//! Serving the connectors bound during startup.

use std::sync::Arc;
use std::time::Duration;

use portlock::admin::{setup_admin_router, AdminState};
use portlock::http::{build_app_router, HttpServer};
use portlock::lifecycle::{LifecycleEvents, Shutdown, StartedService, Startup};
use portlock::ports::PortType;

mod common;

fn start(api_key: Option<&str>) -> (StartedService, AdminState) {
    let started = Startup::new(common::loopback_config(), Arc::new(LifecycleEvents::new()))
        .start()
        .unwrap();
    let state = AdminState::new(&started, api_key.map(String::from), None);
    (started, state)
}

fn port_of(started: &StartedService, port_type: PortType) -> u16 {
    started
        .bound_ports
        .iter()
        .find(|p| p.port_type == port_type)
        .map(|p| p.port)
        .unwrap()
}

#[tokio::test]
async fn test_serves_application_and_admin_connectors() {
    let (started, state) = start(Some("secret"));
    let app_port = port_of(&started, PortType::Application);
    let admin_port = port_of(&started, PortType::Admin);

    let app = build_app_router(&started.service_name, Duration::from_secs(5));
    let admin = setup_admin_router(state);
    let shutdown = Shutdown::new();

    let mut servers = Vec::new();
    for bound in started.listeners {
        let router = match bound.port_type {
            PortType::Application => app.clone(),
            PortType::Admin => admin.clone(),
        };
        servers.push(tokio::spawn(
            HttpServer::new(router, Duration::from_secs(1)).run(bound, shutdown.signalled()),
        ));
    }

    let client = reqwest::Client::new();

    let pong = client
        .get(format!("http://127.0.0.1:{app_port}/ping"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(pong, "pong");

    let health: serde_json::Value = client
        .get(format!("http://127.0.0.1:{admin_port}/healthcheck"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");

    let unauthorized = client
        .get(format!("http://127.0.0.1:{admin_port}/admin/ports"))
        .send()
        .await
        .unwrap();
    assert_eq!(unauthorized.status(), reqwest::StatusCode::UNAUTHORIZED);

    let ports: serde_json::Value = client
        .get(format!("http://127.0.0.1:{admin_port}/admin/ports"))
        .bearer_auth("secret")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ports[0]["port_type"], "application");
    assert_eq!(ports[0]["port"], app_port);
    assert_eq!(ports[1]["port"], admin_port);

    let status: serde_json::Value = client
        .get(format!("http://127.0.0.1:{admin_port}/admin/status"))
        .bearer_auth("secret")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["service"], "it-service");
    assert_eq!(status["lock_state"], "not_attempted");

    shutdown.trigger();
    for server in servers {
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
