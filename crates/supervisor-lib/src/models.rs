//! Core data models for the fleet supervisor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of history entries kept per target
pub const HISTORY_CAP: usize = 100;

/// Maximum number of violations kept per agent
pub const VIOLATION_CAP: usize = 100;

/// Uptime estimate for a target that has never been checked
pub const INITIAL_UPTIME_PERCENT: f64 = 100.0;

/// Role of a target in the fleet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Web,
    Api,
    Orchestration,
    Analytics,
    Monitoring,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Web => write!(f, "web"),
            Category::Api => write!(f, "api"),
            Category::Orchestration => write!(f, "orchestration"),
            Category::Analytics => write!(f, "analytics"),
            Category::Monitoring => write!(f, "monitoring"),
        }
    }
}

/// A network endpoint under observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub url: String,
    pub category: Category,
}

impl Target {
    pub fn new(name: impl Into<String>, url: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            category,
        }
    }

    /// Join a path onto the target's base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Status verdict stored for a target or agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Unknown,
    Healthy,
    Degraded,
    Down,
    Suspicious,
    Stopped,
}

impl Status {
    /// Whether this status counts as "up" for availability estimation
    pub fn is_up(&self) -> bool {
        matches!(self, Status::Healthy | Status::Degraded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unknown => "unknown",
            Status::Healthy => "healthy",
            Status::Degraded => "degraded",
            Status::Down => "down",
            Status::Suspicious => "suspicious",
            Status::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse severity tag attached to supervised agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThreatLevel::Low => write!(f, "low"),
            ThreatLevel::Medium => write!(f, "medium"),
            ThreatLevel::High => write!(f, "high"),
            ThreatLevel::Critical => write!(f, "critical"),
        }
    }
}

/// Current state of a target, one record per name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: Status,
    pub response_time_ms: f64,
    /// `None` until the first check completes
    pub last_check: Option<DateTime<Utc>>,
    pub uptime_percent: f64,
    /// Empty when the last check raised no error
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threat_level: Option<ThreatLevel>,
}

impl StatusRecord {
    /// Record for a worker that has not been checked yet
    pub fn unchecked() -> Self {
        Self {
            status: Status::Unknown,
            response_time_ms: 0.0,
            last_check: None,
            uptime_percent: INITIAL_UPTIME_PERCENT,
            error: String::new(),
            threat_level: None,
        }
    }

    /// Record for an agent that has not been evaluated yet
    pub fn unchecked_agent() -> Self {
        Self {
            threat_level: Some(ThreatLevel::Low),
            ..Self::unchecked()
        }
    }
}

impl Default for StatusRecord {
    fn default() -> Self {
        Self::unchecked()
    }
}

/// One past probe result, kept newest-first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub response_time_ms: f64,
}

/// Severity of a policy violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// A recorded breach of a policy threshold by an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyViolation {
    pub agent: String,
    pub policy: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub details: String,
    pub action_taken: String,
}

/// Raw result of a single probe attempt
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// False when no HTTP response was received at all
    pub succeeded: bool,
    pub status_code: Option<u16>,
    pub response_time_ms: Option<f64>,
    pub error: Option<String>,
}

impl ProbeOutcome {
    pub fn responded(status_code: u16, response_time_ms: f64) -> Self {
        Self {
            succeeded: true,
            status_code: Some(status_code),
            response_time_ms: Some(response_time_ms),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            status_code: None,
            response_time_ms: None,
            error: Some(error.into()),
        }
    }

    /// A response was received and it was a 200
    pub fn is_ok(&self) -> bool {
        self.succeeded && self.status_code == Some(200)
    }
}
