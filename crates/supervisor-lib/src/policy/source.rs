//! Fetching self-reported metrics from supervised agents

use super::{AgentReport, PolicyKind};
use crate::models::Target;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

/// Default timeout for agent metrics requests
pub const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Trait for reading an agent's policy-relevant metrics
#[async_trait]
pub trait AgentMetricsSource: Send + Sync {
    async fn fetch(&self, agent: &Target, kind: PolicyKind) -> Result<AgentReport>;
}

#[derive(Debug, Deserialize)]
struct DeploymentList {
    #[serde(default)]
    deployments: Vec<DeploymentEntry>,
}

#[derive(Debug, Deserialize)]
struct DeploymentEntry {
    #[serde(default)]
    started_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailyCost {
    #[serde(default)]
    total_cost: f64,
}

#[derive(Debug, Deserialize)]
struct MonitorMetrics {
    #[serde(default)]
    down: u64,
}

/// Metrics source speaking the agents' JSON endpoints
pub struct HttpAgentSource {
    client: reqwest::Client,
}

impl HttpAgentSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create agent HTTP client")?;

        Ok(Self { client })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("{} returned {}", url, response.status());
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to decode response from {}", url))
    }
}

#[async_trait]
impl AgentMetricsSource for HttpAgentSource {
    async fn fetch(&self, agent: &Target, kind: PolicyKind) -> Result<AgentReport> {
        let url = agent.endpoint(kind.endpoint());

        let report = match kind {
            PolicyKind::DeploymentRate => {
                let list: DeploymentList = self.get_json(&url).await?;
                AgentReport::Deployments(
                    list.deployments
                        .iter()
                        .map(|d| d.started_at.as_deref().and_then(parse_timestamp))
                        .collect(),
                )
            }
            PolicyKind::DailyCost => {
                let cost: DailyCost = self.get_json(&url).await?;
                AgentReport::DailyCost(cost.total_cost)
            }
            PolicyKind::FailedHealthChecks => {
                let metrics: MonitorMetrics = self.get_json(&url).await?;
                AgentReport::DownCount(metrics.down)
            }
        };

        Ok(report)
    }
}

/// Parse RFC 3339 or naive ISO-8601 timestamps; naive values are taken as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use chrono::{Datelike, Timelike};

    fn agent(url: &str, category: Category) -> Target {
        Target::new("agent", url, category)
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let rfc = parse_timestamp("2024-05-01T10:30:00+02:00").unwrap();
        assert_eq!(rfc.hour(), 8);

        let naive = parse_timestamp("2024-05-01T10:30:00.123456").unwrap();
        assert_eq!(naive.hour(), 10);

        let date = parse_timestamp("2020-01-01").unwrap();
        assert_eq!(date.year(), 2020);

        assert!(parse_timestamp("yesterday").is_none());
    }

    #[tokio::test]
    async fn test_fetch_deployments() {
        let mut server = mockito::Server::new_async().await;
        let now = Utc::now();
        let body = serde_json::json!({
            "deployments": [
                {"started_at": now.to_rfc3339()},
                {"started_at": "not a date"},
                {"id": "missing-start"},
            ]
        });
        server
            .mock("GET", mockito::Matcher::Regex(r"^/deployments".to_string()))
            .match_query(mockito::Matcher::UrlEncoded(
                "limit".to_string(),
                "100".to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let source = HttpAgentSource::new(DEFAULT_AGENT_TIMEOUT).unwrap();
        let report = source
            .fetch(&agent(&server.url(), Category::Orchestration), PolicyKind::DeploymentRate)
            .await
            .unwrap();

        match report {
            AgentReport::Deployments(started) => {
                assert_eq!(started.len(), 3);
                assert!(started[0].is_some());
                assert!(started[1].is_none());
                assert!(started[2].is_none());
            }
            other => panic!("unexpected report {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_cost_and_down_count() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/costs/daily")
            .with_status(200)
            .with_body(r#"{"total_cost": 12, "currency": "USD"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/metrics")
            .with_status(200)
            .with_body(r#"{"total_workers": 35, "down": 7}"#)
            .create_async()
            .await;

        let source = HttpAgentSource::new(DEFAULT_AGENT_TIMEOUT).unwrap();
        let cost = source
            .fetch(&agent(&server.url(), Category::Analytics), PolicyKind::DailyCost)
            .await
            .unwrap();
        assert_eq!(cost, AgentReport::DailyCost(12.0));

        let down = source
            .fetch(&agent(&server.url(), Category::Monitoring), PolicyKind::FailedHealthChecks)
            .await
            .unwrap();
        assert_eq!(down, AgentReport::DownCount(7));
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/costs/daily")
            .with_status(500)
            .create_async()
            .await;

        let source = HttpAgentSource::new(DEFAULT_AGENT_TIMEOUT).unwrap();
        let result = source
            .fetch(&agent(&server.url(), Category::Analytics), PolicyKind::DailyCost)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_undecodable_body_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/metrics")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let source = HttpAgentSource::new(DEFAULT_AGENT_TIMEOUT).unwrap();
        let result = source
            .fetch(&agent(&server.url(), Category::Monitoring), PolicyKind::FailedHealthChecks)
            .await;
        assert!(result.is_err());
    }
}
