//! Behavioral policy checks for supervised agents
//!
//! Each agent category maps to a fixed set of [`PolicyKind`] strategies.
//! A strategy names the report it needs from the agent and judges that
//! report against a threshold in [`PolicyLimits`].

mod evaluator;
mod source;

pub use evaluator::PolicyEvaluator;
pub use source::{parse_timestamp, AgentMetricsSource, HttpAgentSource, DEFAULT_AGENT_TIMEOUT};

use crate::models::{Category, PolicyViolation, Severity};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Policy thresholds
#[derive(Debug, Clone)]
pub struct PolicyLimits {
    /// Recent actions allowed inside `deployment_window`
    pub max_deployments_per_hour: usize,
    pub deployment_window: Duration,
    /// Dollars per reporting period
    pub max_cost_per_day: f64,
    /// Down workers tolerated by a monitoring agent
    pub max_failed_health_checks: u64,
}

impl Default for PolicyLimits {
    fn default() -> Self {
        Self {
            max_deployments_per_hour: 10,
            deployment_window: Duration::from_secs(60 * 60),
            max_cost_per_day: 10.0,
            max_failed_health_checks: 5,
        }
    }
}

/// Data reported by an agent for a single policy
#[derive(Debug, Clone, PartialEq)]
pub enum AgentReport {
    /// Start time of each recent action; `None` when missing or unparseable
    Deployments(Vec<Option<DateTime<Utc>>>),
    DailyCost(f64),
    DownCount(u64),
}

/// Policy strategies, one per monitored behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    DeploymentRate,
    DailyCost,
    FailedHealthChecks,
}

impl PolicyKind {
    /// Strategies that apply to an agent category
    pub fn for_category(category: Category) -> &'static [PolicyKind] {
        match category {
            Category::Orchestration => &[PolicyKind::DeploymentRate],
            Category::Analytics => &[PolicyKind::DailyCost],
            Category::Monitoring => &[PolicyKind::FailedHealthChecks],
            Category::Web | Category::Api => &[],
        }
    }

    pub fn policy_name(&self) -> &'static str {
        match self {
            PolicyKind::DeploymentRate => "max_deployments_per_hour",
            PolicyKind::DailyCost => "max_cost_per_day",
            PolicyKind::FailedHealthChecks => "max_failed_health_checks",
        }
    }

    /// Path on the agent that serves this strategy's report
    pub fn endpoint(&self) -> &'static str {
        match self {
            PolicyKind::DeploymentRate => "deployments?limit=100",
            PolicyKind::DailyCost => "costs/daily",
            PolicyKind::FailedHealthChecks => "metrics",
        }
    }

    /// Judge a report; `None` when within limits or the report does not match
    pub fn judge(
        &self,
        report: &AgentReport,
        now: DateTime<Utc>,
        limits: &PolicyLimits,
    ) -> Option<Finding> {
        match (self, report) {
            (PolicyKind::DeploymentRate, AgentReport::Deployments(started)) => {
                let window = chrono::Duration::from_std(limits.deployment_window)
                    .unwrap_or_else(|_| chrono::Duration::hours(1));
                let cutoff = now - window;
                let recent = started
                    .iter()
                    .filter(|ts| matches!(ts, Some(t) if *t > cutoff))
                    .count();

                (recent > limits.max_deployments_per_hour).then(|| Finding {
                    policy: self.policy_name(),
                    severity: Severity::Critical,
                    details: format!(
                        "Exceeded deployment limit: {} deployments in last hour",
                        recent
                    ),
                    action_taken: "Flagged as suspicious".to_string(),
                    flags_suspicious: true,
                })
            }
            (PolicyKind::DailyCost, AgentReport::DailyCost(total)) => {
                (*total > limits.max_cost_per_day).then(|| Finding {
                    policy: self.policy_name(),
                    severity: Severity::Warning,
                    details: format!(
                        "Daily cost ${:.2} exceeds limit ${:.2}",
                        total, limits.max_cost_per_day
                    ),
                    action_taken: "Alert sent".to_string(),
                    flags_suspicious: false,
                })
            }
            (PolicyKind::FailedHealthChecks, AgentReport::DownCount(down)) => {
                (*down > limits.max_failed_health_checks).then(|| Finding {
                    policy: self.policy_name(),
                    severity: Severity::Critical,
                    details: format!(
                        "{} workers are down (limit: {})",
                        down, limits.max_failed_health_checks
                    ),
                    action_taken: "Alert sent".to_string(),
                    flags_suspicious: false,
                })
            }
            _ => None,
        }
    }
}

/// A threshold breach found during one evaluation pass
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub policy: &'static str,
    pub severity: Severity,
    pub details: String,
    pub action_taken: String,
    /// Whether the breach moves the agent to `suspicious`
    pub flags_suspicious: bool,
}

impl Finding {
    pub fn into_violation(self, agent: &str, timestamp: DateTime<Utc>) -> PolicyViolation {
        PolicyViolation {
            agent: agent.to_string(),
            policy: self.policy.to_string(),
            severity: self.severity,
            timestamp,
            details: self.details,
            action_taken: self.action_taken,
        }
    }
}
