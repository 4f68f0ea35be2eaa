//! Observability infrastructure for the supervisor
//!
//! Provides:
//! - Prometheus metrics (probe latency, cycle duration, outcomes, violations)
//! - Structured JSON logging with tracing

use crate::models::{PolicyViolation, Severity, Status};
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for probe latency (in seconds)
const PROBE_LATENCY_BUCKETS: &[f64] = &[
    0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 3.0, 5.0, 10.0, 30.0,
];

/// Histogram buckets for whole-cycle duration (in seconds)
const CYCLE_DURATION_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<SupervisorMetricsInner> = OnceLock::new();

struct SupervisorMetricsInner {
    probe_latency_seconds: Histogram,
    cycle_duration_seconds: HistogramVec,
    probe_results: IntCounterVec,
    violations: IntCounterVec,
    escalations: IntCounterVec,
    remediations: IntCounterVec,
    alert_failures: IntCounter,
    cycle_errors: IntCounterVec,
    targets_down: IntGauge,
}

impl SupervisorMetricsInner {
    fn new() -> Self {
        Self {
            probe_latency_seconds: register_histogram!(
                "fleet_supervisor_probe_latency_seconds",
                "Latency of successful liveness probes",
                PROBE_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register probe_latency_seconds"),

            cycle_duration_seconds: register_histogram_vec!(
                "fleet_supervisor_cycle_duration_seconds",
                "Wall time of a full supervision cycle",
                &["cycle"],
                CYCLE_DURATION_BUCKETS.to_vec()
            )
            .expect("Failed to register cycle_duration_seconds"),

            probe_results: register_int_counter_vec!(
                "fleet_supervisor_probe_results_total",
                "Probe classifications by status",
                &["status"]
            )
            .expect("Failed to register probe_results_total"),

            violations: register_int_counter_vec!(
                "fleet_supervisor_violations_total",
                "Policy violations recorded",
                &["policy", "severity"]
            )
            .expect("Failed to register violations_total"),

            escalations: register_int_counter_vec!(
                "fleet_supervisor_escalations_total",
                "Agent state transitions by resulting status",
                &["status"]
            )
            .expect("Failed to register escalations_total"),

            remediations: register_int_counter_vec!(
                "fleet_supervisor_remediations_total",
                "Remediation attempts by action",
                &["action"]
            )
            .expect("Failed to register remediations_total"),

            alert_failures: register_int_counter!(
                "fleet_supervisor_alert_failures_total",
                "Alerts that could not be delivered"
            )
            .expect("Failed to register alert_failures_total"),

            cycle_errors: register_int_counter_vec!(
                "fleet_supervisor_cycle_errors_total",
                "Cycles aborted by an unexpected error",
                &["cycle"]
            )
            .expect("Failed to register cycle_errors_total"),

            targets_down: register_int_gauge!(
                "fleet_supervisor_targets_down",
                "Workers classified down in the last completed cycle"
            )
            .expect("Failed to register targets_down"),
        }
    }
}

/// Supervisor metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct SupervisorMetrics {
    _private: (),
}

impl Default for SupervisorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SupervisorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(SupervisorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &SupervisorMetricsInner {
        GLOBAL_METRICS.get_or_init(SupervisorMetricsInner::new)
    }

    pub fn observe_probe_latency(&self, duration_secs: f64) {
        self.inner().probe_latency_seconds.observe(duration_secs);
    }

    pub fn observe_cycle_duration(&self, cycle: &str, duration_secs: f64) {
        self.inner()
            .cycle_duration_seconds
            .with_label_values(&[cycle])
            .observe(duration_secs);
    }

    pub fn inc_probe_result(&self, status: Status) {
        self.inner()
            .probe_results
            .with_label_values(&[status.as_str()])
            .inc();
    }

    pub fn inc_violation(&self, policy: &str, severity: Severity) {
        let severity = severity.to_string();
        self.inner()
            .violations
            .with_label_values(&[policy, severity.as_str()])
            .inc();
    }

    pub fn inc_escalation(&self, status: Status) {
        self.inner()
            .escalations
            .with_label_values(&[status.as_str()])
            .inc();
    }

    pub fn inc_remediation(&self, action: &str) {
        self.inner().remediations.with_label_values(&[action]).inc();
    }

    pub fn inc_alert_failures(&self) {
        self.inner().alert_failures.inc();
    }

    pub fn inc_cycle_errors(&self, cycle: &str) {
        self.inner().cycle_errors.with_label_values(&[cycle]).inc();
    }

    pub fn set_targets_down(&self, count: i64) {
        self.inner().targets_down.set(count);
    }
}

/// Structured logger for supervisor events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str, workers: usize, agents: usize, emergency_stop: bool) {
        info!(
            event = "supervisor_started",
            instance = %self.instance,
            version = %version,
            workers = workers,
            agents = agents,
            emergency_stop = emergency_stop,
            "Fleet supervisor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "supervisor_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Fleet supervisor shutting down"
        );
    }

    /// Log a worker classified down
    pub fn log_target_down(&self, target: &str, status_code: Option<u16>, error: &str) {
        warn!(
            event = "target_down",
            instance = %self.instance,
            target = %target,
            status_code = ?status_code,
            error = %error,
            "Target is down"
        );
    }

    pub fn log_violation(&self, violation: &PolicyViolation) {
        match violation.severity {
            Severity::Critical => {
                warn!(
                    event = "violation_recorded",
                    instance = %self.instance,
                    agent = %violation.agent,
                    policy = %violation.policy,
                    severity = %violation.severity,
                    details = %violation.details,
                    action_taken = %violation.action_taken,
                    "Critical policy violation"
                );
            }
            Severity::Warning => {
                info!(
                    event = "violation_recorded",
                    instance = %self.instance,
                    agent = %violation.agent,
                    policy = %violation.policy,
                    severity = %violation.severity,
                    details = %violation.details,
                    action_taken = %violation.action_taken,
                    "Policy violation"
                );
            }
        }
    }

    pub fn log_escalation(&self, agent: &str, from: Status, to: Status, reason: &str) {
        if from == to {
            return;
        }
        warn!(
            event = "agent_escalated",
            instance = %self.instance,
            agent = %agent,
            from = %from,
            to = %to,
            reason = %reason,
            "Agent state changed"
        );
    }

    pub fn log_remediation(&self, target: &str, action: &str, success: bool) {
        if success {
            info!(
                event = "remediation_attempted",
                instance = %self.instance,
                target = %target,
                action = %action,
                "Remediation attempted"
            );
        } else {
            warn!(
                event = "remediation_failed",
                instance = %self.instance,
                target = %target,
                action = %action,
                "Remediation failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supervisor_metrics_creation() {
        let metrics = SupervisorMetrics::new();
        let again = SupervisorMetrics::new();

        metrics.observe_probe_latency(0.25);
        metrics.observe_cycle_duration("workers", 1.5);
        metrics.inc_probe_result(Status::Healthy);
        metrics.inc_violation("max_cost_per_day", Severity::Warning);
        again.inc_escalation(Status::Suspicious);
        again.inc_remediation("restart");
        again.inc_alert_failures();
        again.inc_cycle_errors("agents");
        again.set_targets_down(2);

        let families = prometheus::gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "fleet_supervisor_probe_results_total"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("supervisor-1");
        assert_eq!(logger.instance, "supervisor-1");
    }
}
