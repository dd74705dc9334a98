//! Typed HTTP client for the Mesos master maintenance API.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::domain::wire::{MaintenanceStatus, SchedulePayload, StateSummary, WireMachineId};

pub struct MasterClient {
    base_url: String,
    auth_token: Option<String>,
    http: Client,
}

impl MasterClient {
    /// Client with the transport's default timeout behaviour.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::build(base_url, None, None)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::build(
            &config.master_url,
            config.auth_token.clone(),
            config.request_timeout_secs.map(Duration::from_secs),
        )
    }

    fn build(base_url: &str, auth_token: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("building HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn state_summary(&self) -> Result<StateSummary> {
        self.get("state-summary").await
    }

    pub async fn maintenance_status(&self) -> Result<MaintenanceStatus> {
        self.get("maintenance/status").await
    }

    pub async fn maintenance_schedule(&self) -> Result<SchedulePayload> {
        self.get("maintenance/schedule").await
    }

    /// Replace the whole schedule.
    pub async fn update_schedule(&self, payload: &SchedulePayload) -> Result<()> {
        self.post("maintenance/schedule", payload).await
    }

    pub async fn machines_up(&self, machines: &[WireMachineId]) -> Result<()> {
        self.post("machine/up", machines).await
    }

    pub async fn machines_down(&self, machines: &[WireMachineId]) -> Result<()> {
        self.post("machine/down", machines).await
    }

    // ── Internal helpers ───────────────────────────────────

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.header("Authorization", format!("token={}", token)),
            None => request,
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!(url = %url, "GET");
        let resp = self
            .authorize(self.http.get(&url))
            .send()
            .await
            .with_context(|| format!("GET {}", url))?;

        if !resp.status().is_success() {
            bail!("{} returned {}", url, resp.status());
        }

        resp.json()
            .await
            .with_context(|| format!("parsing response from {}", url))
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let url = self.url(path);
        debug!(url = %url, "POST");
        let resp = self
            .authorize(self.http.post(&url))
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {}", url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if body.is_empty() {
                bail!("{} returned {}", url, status);
            }
            bail!("{} returned {}: {}", url, status, body.trim());
        }

        Ok(())
    }
}
