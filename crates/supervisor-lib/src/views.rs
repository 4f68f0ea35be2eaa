//! Read-only views over the status store

use crate::error::SupervisorError;
use crate::models::{
    HistoryEntry, PolicyViolation, Severity, Status, StatusRecord, Target, VIOLATION_CAP,
};
use crate::registry::TargetRegistry;
use crate::store::{Scope, StatusStore, StoreError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// History entries returned with a worker detail
pub const DETAIL_HISTORY_LIMIT: usize = 20;

/// Violations returned with an agent detail
pub const DETAIL_VIOLATION_LIMIT: usize = 20;

/// Violation policy names listed per agent
pub const SUMMARY_VIOLATION_LIMIT: usize = 10;

/// Default trailing window for violation queries
pub const DEFAULT_VIOLATION_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetStatus {
    #[serde(flatten)]
    pub target: Target,
    #[serde(flatten)]
    pub record: StatusRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerDetail {
    #[serde(flatten)]
    pub status: TargetStatus,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatus {
    #[serde(flatten)]
    pub status: TargetStatus,
    /// Policy names of the most recent violations
    pub violations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDetail {
    #[serde(flatten)]
    pub status: TargetStatus,
    pub violations: Vec<PolicyViolation>,
}

/// Fleet-wide aggregates, serialized as a flat object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
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
    pub timestamp: DateTime<Utc>,
}

pub async fn list_workers(
    registry: &TargetRegistry,
    store: &dyn StatusStore,
) -> Result<Vec<TargetStatus>, StoreError> {
    let mut out = Vec::with_capacity(registry.workers().len());
    for target in registry.workers() {
        let record = store
            .get_status(Scope::Worker, &target.name)
            .await?
            .unwrap_or_else(StatusRecord::unchecked);
        out.push(TargetStatus {
            target: target.clone(),
            record,
        });
    }
    Ok(out)
}

/// Worker record with recent history; not found until the first check lands
pub async fn worker_detail(
    registry: &TargetRegistry,
    store: &dyn StatusStore,
    name: &str,
) -> Result<WorkerDetail, SupervisorError> {
    let target = registry
        .worker(name)
        .ok_or_else(|| SupervisorError::WorkerNotFound(name.to_string()))?;
    let record = store
        .get_status(Scope::Worker, name)
        .await?
        .ok_or_else(|| SupervisorError::WorkerNotFound(name.to_string()))?;
    let history = store.history(name, DETAIL_HISTORY_LIMIT).await?;

    Ok(WorkerDetail {
        status: TargetStatus {
            target: target.clone(),
            record,
        },
        history,
    })
}

pub async fn list_agents(
    registry: &TargetRegistry,
    store: &dyn StatusStore,
) -> Result<Vec<AgentStatus>, StoreError> {
    let mut out = Vec::with_capacity(registry.agents().len());
    for target in registry.agents() {
        let record = store
            .get_status(Scope::Agent, &target.name)
            .await?
            .unwrap_or_else(StatusRecord::unchecked_agent);
        let violations = store
            .violations(&target.name, SUMMARY_VIOLATION_LIMIT)
            .await?
            .into_iter()
            .map(|v| v.policy)
            .collect();
        out.push(AgentStatus {
            status: TargetStatus {
                target: target.clone(),
                record,
            },
            violations,
        });
    }
    Ok(out)
}

pub async fn agent_detail(
    registry: &TargetRegistry,
    store: &dyn StatusStore,
    name: &str,
) -> Result<AgentDetail, SupervisorError> {
    let target = registry
        .agent(name)
        .ok_or_else(|| SupervisorError::AgentNotFound(name.to_string()))?;
    let record = store
        .get_status(Scope::Agent, name)
        .await?
        .unwrap_or_else(StatusRecord::unchecked_agent);
    let violations = store.violations(name, DETAIL_VIOLATION_LIMIT).await?;

    Ok(AgentDetail {
        status: TargetStatus {
            target: target.clone(),
            record,
        },
        violations,
    })
}

/// Start of the trailing window; a window reaching past the representable
/// range covers everything
fn window_start(hours: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    Duration::try_hours(hours.max(0))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Violations across all agents at or after `hours` before `now`, newest first
pub async fn violations_since(
    registry: &TargetRegistry,
    store: &dyn StatusStore,
    hours: i64,
    now: DateTime<Utc>,
) -> Result<Vec<PolicyViolation>, StoreError> {
    let cutoff = window_start(hours, now);
    let mut out = Vec::new();
    for agent in registry.agents() {
        out.extend(
            store
                .violations(&agent.name, VIOLATION_CAP)
                .await?
                .into_iter()
                .filter(|v| v.timestamp >= cutoff),
        );
    }
    out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(out)
}

fn count_status(records: &[&StatusRecord], status: Status) -> usize {
    records.iter().filter(|r| r.status == status).count()
}

pub async fn fleet_metrics(
    registry: &TargetRegistry,
    store: &dyn StatusStore,
    now: DateTime<Utc>,
) -> Result<FleetMetrics, StoreError> {
    let workers = list_workers(registry, store).await?;
    let agents = list_agents(registry, store).await?;
    let recent = violations_since(registry, store, DEFAULT_VIOLATION_HOURS, now).await?;

    let worker_records: Vec<&StatusRecord> = workers.iter().map(|w| &w.record).collect();
    let agent_records: Vec<&StatusRecord> = agents.iter().map(|a| &a.status.record).collect();

    let checked: Vec<&StatusRecord> = worker_records
        .iter()
        .copied()
        .filter(|r| r.last_check.is_some())
        .collect();
    let uptime_percent = if checked.is_empty() {
        crate::models::INITIAL_UPTIME_PERCENT
    } else {
        checked.iter().map(|r| r.uptime_percent).sum::<f64>() / checked.len() as f64
    };
    // Unreachable workers store zero latency and stay out of the average
    let responded: Vec<f64> = checked
        .iter()
        .map(|r| r.response_time_ms)
        .filter(|ms| *ms > 0.0)
        .collect();
    let avg_response_time_ms = if responded.is_empty() {
        0.0
    } else {
        responded.iter().sum::<f64>() / responded.len() as f64
    };

    Ok(FleetMetrics {
        total_workers: workers.len(),
        healthy: count_status(&worker_records, Status::Healthy),
        degraded: count_status(&worker_records, Status::Degraded),
        down: count_status(&worker_records, Status::Down),
        avg_response_time_ms,
        uptime_percent,
        total_agents: agents.len(),
        agents_healthy: count_status(&agent_records, Status::Healthy),
        suspicious: count_status(&agent_records, Status::Suspicious),
        stopped: count_status(&agent_records, Status::Stopped),
        total_violations_24h: recent.len(),
        critical_alerts_24h: recent
            .iter()
            .filter(|v| v.severity == Severity::Critical)
            .count(),
        timestamp: now,
    })
}
