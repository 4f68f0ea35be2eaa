//! Best-effort remediation
//!
//! Recovery actions are simulated: the actuator announces the attempt and
//! waits out a fixed delay. No infrastructure API is called.

use crate::models::Target;
use crate::notify::{AlertLevel, Notifier};
use crate::observability::{StructuredLogger, SupervisorMetrics};
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default simulated restart delay
pub const DEFAULT_REMEDIATION_DELAY: Duration = Duration::from_secs(2);

/// Recovery action requested for a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemediationAction {
    /// Redeploy a worker classified down
    Restart,
    /// Undo an agent's recent actions after a rate violation
    Rollback,
    /// Halt an agent after an emergency stop
    Halt,
}

impl RemediationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemediationAction::Restart => "restart",
            RemediationAction::Rollback => "rollback",
            RemediationAction::Halt => "halt",
        }
    }
}

impl std::fmt::Display for RemediationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for remediation backends
#[async_trait]
pub trait RemediationActuator: Send + Sync {
    async fn execute(&self, target: &Target, action: RemediationAction) -> Result<()>;
}

/// Actuator that announces the action and simulates its duration
pub struct SimulatedActuator {
    notifier: Notifier,
    delay: Duration,
}

impl SimulatedActuator {
    pub fn new(notifier: Notifier, delay: Duration) -> Self {
        Self { notifier, delay }
    }
}

#[async_trait]
impl RemediationActuator for SimulatedActuator {
    async fn execute(&self, target: &Target, action: RemediationAction) -> Result<()> {
        info!(target = %target.name, action = %action, "Attempting remediation");

        let message = match action {
            RemediationAction::Restart => format!("Auto-restarting worker: {}", target.name),
            RemediationAction::Rollback => {
                format!("Rolling back recent actions of agent: {}", target.name)
            }
            RemediationAction::Halt => format!("Halting agent: {}", target.name),
        };
        self.notifier.send(AlertLevel::Warning, message).await;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(())
    }
}

/// Front for an actuator with an optional per-target in-flight guard.
///
/// With a non-zero cooldown, a second request for the same target within
/// the cooldown is skipped. A zero cooldown lets every request through.
#[derive(Clone)]
pub struct Remediator {
    actuator: Arc<dyn RemediationActuator>,
    cooldown: Duration,
    in_flight: Arc<DashMap<String, Instant>>,
    metrics: SupervisorMetrics,
    logger: StructuredLogger,
}

impl Remediator {
    pub fn new(
        actuator: Arc<dyn RemediationActuator>,
        cooldown: Duration,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            actuator,
            cooldown,
            in_flight: Arc::new(DashMap::new()),
            metrics: SupervisorMetrics::new(),
            logger,
        }
    }

    /// Claim the target's slot; false if another attempt holds it
    fn claim(&self, name: &str) -> bool {
        if self.cooldown.is_zero() {
            return true;
        }

        let now = Instant::now();
        let mut claimed = false;
        self.in_flight
            .entry(name.to_string())
            .and_modify(|started| {
                if now.duration_since(*started) >= self.cooldown {
                    *started = now;
                    claimed = true;
                }
            })
            .or_insert_with(|| {
                claimed = true;
                now
            });
        claimed
    }

    /// Run the action; returns false if it was skipped or failed
    pub async fn remediate(&self, target: &Target, action: RemediationAction) -> bool {
        if !self.claim(&target.name) {
            debug!(target = %target.name, action = %action, "Remediation already in flight, skipping");
            return false;
        }

        self.metrics.inc_remediation(action.as_str());
        match self.actuator.execute(target, action).await {
            Ok(()) => {
                self.logger.log_remediation(&target.name, action.as_str(), true);
                true
            }
            Err(e) => {
                tracing::warn!(target = %target.name, action = %action, error = %e, "Remediation error");
                self.logger.log_remediation(&target.name, action.as_str(), false);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use crate::notify::MemorySink;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingActuator {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl RemediationActuator for CountingActuator {
        async fn execute(&self, _target: &Target, _action: RemediationAction) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("infrastructure API unavailable");
            }
            Ok(())
        }
    }

    fn worker() -> Target {
        Target::new("hub", "https://hub.example/health", Category::Web)
    }

    #[tokio::test]
    async fn test_simulated_actuator_announces_restart() {
        let sink = Arc::new(MemorySink::new());
        let actuator = SimulatedActuator::new(Notifier::new(sink.clone()), Duration::ZERO);

        actuator
            .execute(&worker(), RemediationAction::Restart)
            .await
            .unwrap();

        let alerts = sink.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, AlertLevel::Warning);
        assert!(alerts[0].message.contains("Auto-restarting worker: hub"));
    }

    #[tokio::test]
    async fn test_zero_cooldown_never_skips() {
        let actuator = Arc::new(CountingActuator {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let remediator = Remediator::new(
            actuator.clone(),
            Duration::ZERO,
            StructuredLogger::new("test"),
        );

        assert!(remediator.remediate(&worker(), RemediationAction::Restart).await);
        assert!(remediator.remediate(&worker(), RemediationAction::Restart).await);
        assert_eq!(actuator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cooldown_suppresses_duplicate_attempts() {
        let actuator = Arc::new(CountingActuator {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let remediator = Remediator::new(
            actuator.clone(),
            Duration::from_secs(60),
            StructuredLogger::new("test"),
        );

        assert!(remediator.remediate(&worker(), RemediationAction::Restart).await);
        assert!(!remediator.remediate(&worker(), RemediationAction::Restart).await);

        let other = Target::new("blog", "https://blog.example/health", Category::Web);
        assert!(remediator.remediate(&other, RemediationAction::Restart).await);
        assert_eq!(actuator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_actuator_failure_is_not_propagated() {
        let actuator = Arc::new(CountingActuator {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let remediator = Remediator::new(actuator, Duration::ZERO, StructuredLogger::new("test"));

        assert!(!remediator.remediate(&worker(), RemediationAction::Restart).await);
    }
}
