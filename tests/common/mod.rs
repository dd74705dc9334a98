//! Mock Mesos master for integration tests
//!
//! Serves the three read endpoints from canned JSON and records every
//! write so tests can assert on exactly what reached the master.

#![allow(dead_code)]

use drydock::client::MasterClient;
use drydock::config::MaintenanceConfig;
use drydock::domain::maintenance_service::MaintenanceService;
use serde_json::{json, Value};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

pub struct MockMaster {
    pub server: MockServer,
    pub base_url: String,
}

impl MockMaster {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();
        Self { server, base_url }
    }

    /// Register agents as `(hostname, ip, agent id)`.
    pub async fn agents(&self, agents: &[(&str, &str, &str)]) {
        let slaves: Vec<Value> = agents
            .iter()
            .map(|(hostname, ip, id)| {
                json!({
                    "id": id,
                    "hostname": hostname,
                    "pid": format!("slave(1)@{}:5051", ip),
                })
            })
            .collect();
        self.get_json("/state-summary", json!({ "slaves": slaves }))
            .await;
    }

    pub async fn status(&self, body: Value) {
        self.get_json("/maintenance/status", body).await;
    }

    pub async fn no_status(&self) {
        self.status(json!({})).await;
    }

    pub async fn schedule(&self, body: Value) {
        self.get_json("/maintenance/schedule", body).await;
    }

    pub async fn no_schedule(&self) {
        self.schedule(json!({})).await;
    }

    pub async fn get_json(&self, route: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    pub async fn get_fails(&self, route: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Accept every write endpoint.
    pub async fn accept_writes(&self) {
        for route in ["/maintenance/schedule", "/machine/up", "/machine/down"] {
            Mock::given(method("POST"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(200))
                .mount(&self.server)
                .await;
        }
    }

    pub async fn reject_write(&self, route: &str, status: u16, body: &str) {
        Mock::given(method("POST"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Every POST received, as `(path, json body)`, in arrival order.
    pub async fn writes(&self) -> Vec<(String, Value)> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.method.as_str() == "POST")
            .map(|r| {
                let body = serde_json::from_slice(&r.body).unwrap_or(Value::Null);
                (r.url.path().to_string(), body)
            })
            .collect()
    }

    pub fn client(&self) -> MasterClient {
        MasterClient::new(&self.base_url).expect("client builds")
    }

    pub fn service(&self) -> MaintenanceService {
        self.service_with(MaintenanceConfig::default())
    }

    pub fn service_with(&self, config: MaintenanceConfig) -> MaintenanceService {
        MaintenanceService::new(self.client(), config)
    }
}

pub fn hosts(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| t.to_string()).collect()
}

pub fn window(machines: Value, start_secs: i64, duration_secs: i64) -> Value {
    json!({
        "machine_ids": machines,
        "unavailability": {
            "start": { "nanoseconds": start_secs * 1_000_000_000 },
            "duration": { "nanoseconds": duration_secs * 1_000_000_000 }
        }
    })
}
