//! Agent escalation state machine
//!
//! ```text
//! unknown -> healthy <-> suspicious -> stopped
//! ```
//!
//! Automatic passes move agents between `healthy` and `suspicious` only.
//! `stopped` is entered through an operator stop and is terminal for the
//! lifetime of the process: stopped names are kept in an in-process set
//! and every automatic write re-checks that set under the same gate the
//! stop takes.

use crate::error::SupervisorError;
use crate::models::{
    PolicyViolation, ProbeOutcome, Severity, Status, StatusRecord, Target, ThreatLevel,
};
use crate::notify::{AlertLevel, Notifier};
use crate::observability::{StructuredLogger, SupervisorMetrics};
use crate::policy::Finding;
use crate::registry::TargetRegistry;
use crate::remediation::{RemediationAction, Remediator};
use crate::store::{Scope, StatusStore, StoreError};
use crate::uptime::UptimeEstimator;
use chrono::{DateTime, Utc};
use dashmap::DashSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Policy name recorded for operator stops
pub const EMERGENCY_STOP_POLICY: &str = "emergency_stop";

/// Outcome of one automatic evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: Status,
    pub threat_level: ThreatLevel,
    pub reason: String,
}

/// Decide an agent's next state from its liveness and policy findings
pub fn transition(live: bool, findings: &[Finding]) -> Verdict {
    if !live {
        return Verdict {
            status: Status::Suspicious,
            threat_level: ThreatLevel::High,
            reason: "liveness check failed".to_string(),
        };
    }

    if let Some(flagging) = findings.iter().find(|f| f.flags_suspicious) {
        return Verdict {
            status: Status::Suspicious,
            threat_level: ThreatLevel::High,
            reason: format!("policy {} breached", flagging.policy),
        };
    }

    if findings.is_empty() {
        Verdict {
            status: Status::Healthy,
            threat_level: ThreatLevel::Low,
            reason: "all checks passed".to_string(),
        }
    } else {
        Verdict {
            status: Status::Healthy,
            threat_level: ThreatLevel::Medium,
            reason: format!("{} non-critical violation(s)", findings.len()),
        }
    }
}

/// Confirmation returned by a successful emergency stop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopReceipt {
    pub agent: String,
    pub status: Status,
    pub threat_level: ThreatLevel,
    pub timestamp: DateTime<Utc>,
}

/// Applies verdicts and operator stops to the agent keyspace
pub struct EscalationMachine {
    store: Arc<dyn StatusStore>,
    registry: Arc<TargetRegistry>,
    notifier: Notifier,
    remediator: Remediator,
    emergency_stop_enabled: bool,
    stopped: DashSet<String>,
    write_gate: Mutex<()>,
    estimator: UptimeEstimator,
    metrics: SupervisorMetrics,
    logger: StructuredLogger,
}

impl EscalationMachine {
    pub fn new(
        store: Arc<dyn StatusStore>,
        registry: Arc<TargetRegistry>,
        notifier: Notifier,
        remediator: Remediator,
        emergency_stop_enabled: bool,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            store,
            registry,
            notifier,
            remediator,
            emergency_stop_enabled,
            stopped: DashSet::new(),
            write_gate: Mutex::new(()),
            estimator: UptimeEstimator::new(),
            metrics: SupervisorMetrics::new(),
            logger,
        }
    }

    pub fn emergency_stop_enabled(&self) -> bool {
        self.emergency_stop_enabled
    }

    pub fn is_stopped(&self, name: &str) -> bool {
        self.stopped.contains(name)
    }

    /// Persist a violation and count it
    pub async fn record_violation(&self, violation: PolicyViolation) -> Result<(), StoreError> {
        self.logger.log_violation(&violation);
        self.metrics
            .inc_violation(&violation.policy, violation.severity);
        self.store.push_violation(violation).await
    }

    /// Fold one automatic observation into the agent's record.
    ///
    /// Returns the resulting status. Stopped agents are left untouched.
    pub async fn apply(
        &self,
        agent: &Target,
        liveness: &ProbeOutcome,
        findings: Vec<Finding>,
    ) -> Result<Status, StoreError> {
        if self.is_stopped(&agent.name) {
            debug!(agent = %agent.name, "Agent is stopped, skipping evaluation");
            return Ok(Status::Stopped);
        }

        let now = Utc::now();
        let live = liveness.is_ok();
        let verdict = transition(live, &findings);
        let rollback = findings.iter().any(|f| f.flags_suspicious);

        let (previous, alerts) = {
            let _gate = self.write_gate.lock().await;
            let previous = self.store.get_status(Scope::Agent, &agent.name).await?;
            if matches!(&previous, Some(r) if r.status == Status::Stopped) {
                // Restored from a snapshot taken after a stop
                self.stopped.insert(agent.name.clone());
            }
            if self.is_stopped(&agent.name) {
                debug!(agent = %agent.name, "Agent stopped during evaluation, discarding findings");
                return Ok(Status::Stopped);
            }

            let mut alerts = Vec::with_capacity(findings.len());
            for finding in findings {
                let violation = finding.into_violation(&agent.name, now);
                let level = match violation.severity {
                    Severity::Critical => AlertLevel::Critical,
                    Severity::Warning => AlertLevel::Warning,
                };
                alerts.push((
                    level,
                    format!(
                        "Policy violation by {}: {} ({})",
                        agent.name, violation.details, violation.action_taken
                    ),
                ));
                self.record_violation(violation).await?;
            }

            let record = StatusRecord {
                status: verdict.status,
                response_time_ms: liveness
                    .response_time_ms
                    .filter(|ms| ms.is_finite() && *ms >= 0.0)
                    .unwrap_or(0.0),
                last_check: Some(now),
                uptime_percent: self
                    .estimator
                    .observe(previous.as_ref().map(|r| r.uptime_percent), live),
                error: liveness_error(liveness),
                threat_level: Some(verdict.threat_level),
            };
            self.store
                .put_status(Scope::Agent, &agent.name, record)
                .await?;
            (previous, alerts)
        };

        for (level, message) in alerts {
            self.notifier.send(level, message).await;
        }

        let from = previous.map(|r| r.status).unwrap_or_default();
        if from != verdict.status {
            self.metrics.inc_escalation(verdict.status);
            self.logger
                .log_escalation(&agent.name, from, verdict.status, &verdict.reason);
        }

        if !live {
            self.notifier
                .send(
                    AlertLevel::Error,
                    format!(
                        "Agent {} failed liveness check: {}",
                        agent.name,
                        liveness_error(liveness)
                    ),
                )
                .await;
        }

        if rollback {
            self.remediator
                .remediate(agent, RemediationAction::Rollback)
                .await;
        }

        Ok(verdict.status)
    }

    /// Operator stop: terminal transition to `stopped`.
    ///
    /// The feature flag is checked before the name so a disabled stop never
    /// reveals which agents exist.
    pub async fn emergency_stop(&self, name: &str) -> Result<StopReceipt, SupervisorError> {
        if !self.emergency_stop_enabled {
            return Err(SupervisorError::EmergencyStopDisabled);
        }
        let agent = self
            .registry
            .agent(name)
            .cloned()
            .ok_or_else(|| SupervisorError::AgentNotFound(name.to_string()))?;

        let now = Utc::now();
        let from = {
            let _gate = self.write_gate.lock().await;
            let previous = self.store.get_status(Scope::Agent, &agent.name).await?;
            let from = previous.as_ref().map(|r| r.status).unwrap_or_default();
            let record = StatusRecord {
                status: Status::Stopped,
                threat_level: Some(ThreatLevel::Critical),
                ..previous.unwrap_or_else(StatusRecord::unchecked_agent)
            };
            self.store
                .put_status(Scope::Agent, &agent.name, record)
                .await?;
            // Joined only once the stopped record is persisted
            self.stopped.insert(agent.name.clone());
            from
        };

        self.record_violation(PolicyViolation {
            agent: agent.name.clone(),
            policy: EMERGENCY_STOP_POLICY.to_string(),
            severity: Severity::Critical,
            timestamp: now,
            details: "Agent manually stopped by operator".to_string(),
            action_taken: "Agent stopped".to_string(),
        })
        .await?;

        self.metrics.inc_escalation(Status::Stopped);
        self.logger
            .log_escalation(&agent.name, from, Status::Stopped, "emergency stop");
        self.notifier
            .send(
                AlertLevel::Critical,
                format!("EMERGENCY STOP executed for agent: {}", agent.name),
            )
            .await;
        info!(agent = %agent.name, "Emergency stop executed");

        let remediator = self.remediator.clone();
        let halted = agent.clone();
        tokio::spawn(async move {
            remediator.remediate(&halted, RemediationAction::Halt).await;
        });

        Ok(StopReceipt {
            agent: agent.name,
            status: Status::Stopped,
            threat_level: ThreatLevel::Critical,
            timestamp: now,
        })
    }
}

fn liveness_error(liveness: &ProbeOutcome) -> String {
    match (&liveness.error, liveness.status_code) {
        (Some(e), _) => e.clone(),
        (None, Some(code)) if code != 200 => format!("HTTP {}", code),
        _ => String::new(),
    }
}
