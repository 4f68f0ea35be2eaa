//! Chat webhook delivery

use super::{Alert, NotificationSink};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Webhook sink configuration
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
    /// Display name the message is posted under
    pub username: String,
    pub icon_emoji: String,
    pub timeout: Duration,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: "Fleet Supervisor".to_string(),
            icon_emoji: ":shield:".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Message body posted to the webhook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub text: String,
    pub username: String,
    pub icon_emoji: String,
}

/// Sink posting each alert as a JSON message
pub struct WebhookSink {
    client: reqwest::Client,
    config: WebhookConfig,
}

impl WebhookSink {
    pub fn new(config: WebhookConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create webhook HTTP client")?;

        Ok(Self { client, config })
    }

    pub fn payload(&self, alert: &Alert) -> WebhookPayload {
        WebhookPayload {
            text: alert.render(),
            username: self.config.username.clone(),
            icon_emoji: self.config.icon_emoji.clone(),
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(&self, alert: &Alert) -> Result<()> {
        let response = self
            .client
            .post(&self.config.url)
            .json(&self.payload(alert))
            .send()
            .await
            .context("Failed to send webhook request")?;

        if !response.status().is_success() {
            anyhow::bail!("Webhook rejected alert ({})", response.status());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::AlertLevel;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_posts_structured_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "username": "Fleet Supervisor",
                "icon_emoji": ":shield:",
            })))
            .with_status(200)
            .create_async()
            .await;

        let sink = WebhookSink::new(WebhookConfig::new(format!("{}/hook", server.url()))).unwrap();
        sink.deliver(&Alert::new(AlertLevel::Warning, "Auto-restarting worker: hub"))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_delivery_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/hook")
            .with_status(500)
            .create_async()
            .await;

        let sink = WebhookSink::new(WebhookConfig::new(format!("{}/hook", server.url()))).unwrap();
        let result = sink.deliver(&Alert::new(AlertLevel::Error, "down")).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_payload_text_carries_marker() {
        let sink = WebhookSink::new(WebhookConfig::new("http://localhost/hook")).unwrap();
        let payload = sink.payload(&Alert::new(AlertLevel::Critical, "stop"));
        assert_eq!(payload.text, format!("{} stop", AlertLevel::Critical.marker()));
    }
}
