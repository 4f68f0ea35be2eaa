//! Outbound alerting
//!
//! Alerts are fire-and-forget: a delivery failure is logged and counted,
//! never retried and never propagated to the pipeline that raised it.
//! The delivery mechanism is a pluggable [`NotificationSink`].

mod webhook;

pub use webhook::{WebhookConfig, WebhookPayload, WebhookSink};

use crate::observability::SupervisorMetrics;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

/// Alert levels, mapped to a leading marker in the rendered text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Success,
    Warning,
    Error,
    Critical,
}

impl AlertLevel {
    pub fn marker(&self) -> &'static str {
        match self {
            AlertLevel::Info => "\u{2139}\u{fe0f}",
            AlertLevel::Success => "\u{2705}",
            AlertLevel::Warning => "\u{26a0}\u{fe0f}",
            AlertLevel::Error => "\u{274c}",
            AlertLevel::Critical => "\u{1f6a8}",
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::Info => write!(f, "info"),
            AlertLevel::Success => write!(f, "success"),
            AlertLevel::Warning => write!(f, "warning"),
            AlertLevel::Error => write!(f, "error"),
            AlertLevel::Critical => write!(f, "critical"),
        }
    }
}

/// A single outbound notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
}

impl Alert {
    pub fn new(level: AlertLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    /// Text as delivered to chat-style sinks
    pub fn render(&self) -> String {
        format!("{} {}", self.level.marker(), self.message)
    }
}

/// Delivery mechanism for alerts
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, alert: &Alert) -> Result<()>;
}

/// Sink that writes alerts to the log; used when no webhook is configured
#[derive(Debug, Default)]
pub struct ConsoleSink;

#[async_trait]
impl NotificationSink for ConsoleSink {
    async fn deliver(&self, alert: &Alert) -> Result<()> {
        match alert.level {
            AlertLevel::Error | AlertLevel::Critical => {
                warn!(event = "alert", level = %alert.level, message = %alert.message, "Alert raised");
            }
            _ => {
                info!(event = "alert", level = %alert.level, message = %alert.message, "Alert raised");
            }
        }
        Ok(())
    }
}

/// Sink that drops everything
#[derive(Debug, Default)]
pub struct NoopSink;

#[async_trait]
impl NotificationSink for NoopSink {
    async fn deliver(&self, _alert: &Alert) -> Result<()> {
        Ok(())
    }
}

/// Sink that keeps delivered alerts in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    alerts: Mutex<Vec<Alert>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alerts delivered so far, oldest first
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn count_at(&self, level: AlertLevel) -> usize {
        self.alerts().iter().filter(|a| a.level == level).count()
    }
}

#[async_trait]
impl NotificationSink for MemorySink {
    async fn deliver(&self, alert: &Alert) -> Result<()> {
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.push(alert.clone());
        }
        Ok(())
    }
}

/// Cloneable front for a sink that swallows delivery failures
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    metrics: SupervisorMetrics,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink,
            metrics: SupervisorMetrics::new(),
        }
    }

    /// Deliver an alert; failures are logged and counted only
    pub async fn notify(&self, alert: Alert) {
        if let Err(e) = self.sink.deliver(&alert).await {
            self.metrics.inc_alert_failures();
            error!(
                level = %alert.level,
                message = %alert.message,
                error = %e,
                "Failed to deliver alert"
            );
        }
    }

    pub async fn send(&self, level: AlertLevel, message: impl Into<String>) {
        self.notify(Alert::new(level, message)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSink;

    #[async_trait]
    impl NotificationSink for FailingSink {
        async fn deliver(&self, _alert: &Alert) -> Result<()> {
            anyhow::bail!("webhook returned 500")
        }
    }

    #[test]
    fn test_render_prefixes_marker() {
        let alert = Alert::new(AlertLevel::Critical, "EMERGENCY STOP executed");
        assert!(alert.render().starts_with(AlertLevel::Critical.marker()));
        assert!(alert.render().ends_with("EMERGENCY STOP executed"));
    }

    #[tokio::test]
    async fn test_memory_sink_records_in_order() {
        let sink = Arc::new(MemorySink::new());
        let notifier = Notifier::new(sink.clone());

        notifier.send(AlertLevel::Error, "first").await;
        notifier.send(AlertLevel::Warning, "second").await;

        let alerts = sink.alerts();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].message, "first");
        assert_eq!(sink.count_at(AlertLevel::Warning), 1);
    }

    #[tokio::test]
    async fn test_failed_delivery_is_swallowed() {
        let notifier = Notifier::new(Arc::new(FailingSink));
        // Must not panic or propagate
        notifier.send(AlertLevel::Error, "lost").await;
    }

    #[tokio::test]
    async fn test_console_and_noop_sinks_accept_everything() {
        let alert = Alert::new(AlertLevel::Info, "started");
        assert!(ConsoleSink.deliver(&alert).await.is_ok());
        assert!(NoopSink.deliver(&alert).await.is_ok());
    }
}
