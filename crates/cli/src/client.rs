//! API client for the Fleet Supervisor

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the supervisor's query and control surface
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    /// POST without a body; the control endpoints take none
    pub async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }
}

// API response types

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
    #[allow(dead_code)]
    pub code: String,
}

/// Fields shared by worker and agent records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetRecord {
    pub name: String,
    pub url: String,
    pub category: String,
    pub status: String,
    pub response_time_ms: f64,
    #[serde(default)]
    pub last_check: Option<String>,
    pub uptime_percent: f64,
    #[serde(default)]
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerList {
    pub total: usize,
    pub workers: Vec<TargetRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub status: String,
    #[serde(default)]
    pub status_code: Option<u16>,
    pub response_time_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerDetail {
    #[serde(flatten)]
    pub record: TargetRecord,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSummary {
    #[serde(flatten)]
    pub record: TargetRecord,
    /// Policy names of recent violations
    #[serde(default)]
    pub violations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentList {
    pub total: usize,
    pub agents: Vec<AgentSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub agent: String,
    pub policy: String,
    pub severity: String,
    pub timestamp: String,
    pub details: String,
    pub action_taken: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDetail {
    #[serde(flatten)]
    pub record: TargetRecord,
    pub violations: Vec<Violation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationList {
    pub hours: i64,
    pub total: usize,
    pub violations: Vec<Violation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetMetrics {
    pub total_workers: usize,
    pub healthy: usize,
    pub degraded: usize,
    pub down: usize,
    pub avg_response_time_ms: f64,
    pub uptime_percent: f64,
    pub total_agents: usize,
    pub agents_healthy: usize,
    pub suspicious: usize,
    pub stopped: usize,
    pub total_violations_24h: usize,
    pub critical_alerts_24h: usize,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub status: String,
    pub targets: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopReceipt {
    pub agent: String,
    pub status: String,
    pub threat_level: String,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_workers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/workers")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"total":1,"workers":[{"name":"hub","url":"https://hub.example/health",
                "category":"web","status":"healthy","response_time_ms":120.5,
                "last_check":"2024-05-01T10:00:00Z","uptime_percent":99.5,"error":""}]}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let list: WorkerList = client.get("workers").await.unwrap();

        mock.assert_async().await;
        assert_eq!(list.total, 1);
        assert_eq!(list.workers[0].name, "hub");
        assert!(list.workers[0].threat_level.is_none());
    }

    #[tokio::test]
    async fn test_error_body_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/stop/ghost-agent")
            .with_status(404)
            .with_body(r#"{"error":"agent not found: ghost-agent","code":"not_found"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .post::<StopReceipt>("stop/ghost-agent")
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("404"));
        assert!(message.contains("agent not found: ghost-agent"));
    }

    #[tokio::test]
    async fn test_agent_detail_flattened() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/agents/cost-optimizer")
            .with_status(200)
            .with_body(
                r#"{"name":"cost-optimizer","url":"http://co:6002","category":"analytics",
                "status":"stopped","response_time_ms":0.0,"last_check":null,
                "uptime_percent":100.0,"error":"","threat_level":"critical",
                "violations":[{"agent":"cost-optimizer","policy":"emergency_stop",
                "severity":"critical","timestamp":"2024-05-01T10:00:00Z",
                "details":"Agent manually stopped by operator","action_taken":"Agent stopped"}]}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let detail: AgentDetail = client.get("agents/cost-optimizer").await.unwrap();

        assert_eq!(detail.record.status, "stopped");
        assert_eq!(detail.record.threat_level.as_deref(), Some("critical"));
        assert_eq!(detail.violations[0].policy, "emergency_stop");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
