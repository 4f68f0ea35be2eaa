//! Agent supervision passes

use super::{Cycle, CycleSummary};
use crate::escalation::EscalationMachine;
use crate::models::{Status, Target};
use crate::observability::SupervisorMetrics;
use crate::policy::PolicyEvaluator;
use crate::probe::Prober;
use crate::registry::TargetRegistry;
use crate::store::{StatusStore, StoreError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Path of an agent's liveness endpoint
pub const LIVENESS_PATH: &str = "health";

/// Checks liveness and policies of every agent once, concurrently
#[derive(Clone)]
pub struct AgentCycle {
    registry: Arc<TargetRegistry>,
    prober: Arc<dyn Prober>,
    evaluator: PolicyEvaluator,
    machine: Arc<EscalationMachine>,
    store: Arc<dyn StatusStore>,
    metrics: SupervisorMetrics,
}

impl AgentCycle {
    pub fn new(
        registry: Arc<TargetRegistry>,
        prober: Arc<dyn Prober>,
        evaluator: PolicyEvaluator,
        machine: Arc<EscalationMachine>,
        store: Arc<dyn StatusStore>,
    ) -> Self {
        Self {
            registry,
            prober,
            evaluator,
            machine,
            store,
            metrics: SupervisorMetrics::new(),
        }
    }

    /// Evaluate one agent; stopped agents are not contacted
    pub async fn supervise(&self, agent: &Target) -> Result<Status, StoreError> {
        if self.machine.is_stopped(&agent.name) {
            debug!(agent = %agent.name, "Skipping stopped agent");
            return Ok(Status::Stopped);
        }

        let liveness = self.prober.probe(&agent.endpoint(LIVENESS_PATH)).await;
        let findings = if liveness.is_ok() {
            self.evaluator.evaluate(agent).await
        } else {
            Vec::new()
        };

        self.machine.apply(agent, &liveness, findings).await
    }
}

#[async_trait]
impl Cycle for AgentCycle {
    fn name(&self) -> &'static str {
        "agents"
    }

    fn target_count(&self) -> usize {
        self.registry.agents().len()
    }

    async fn run(&self) -> Result<CycleSummary> {
        self.store
            .ping()
            .await
            .context("status store unreachable")?;

        let start = Instant::now();
        let mut set = JoinSet::new();
        for agent in self.registry.agents().iter().cloned() {
            let cycle = self.clone();
            set.spawn(async move {
                let result = cycle.supervise(&agent).await;
                (agent.name, result)
            });
        }

        let mut summary = CycleSummary {
            targets: self.registry.agents().len(),
            ..Default::default()
        };
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(Status::Suspicious))) => summary.suspicious += 1,
                Ok((_, Ok(Status::Stopped))) => summary.skipped += 1,
                Ok((_, Ok(_))) => {}
                Ok((name, Err(e))) => {
                    summary.failures += 1;
                    warn!(agent = %name, error = %e, "Agent supervision failed");
                }
                Err(e) => {
                    summary.failures += 1;
                    warn!(error = %e, "Agent supervision task panicked");
                }
            }
        }

        self.metrics
            .observe_cycle_duration(self.name(), start.elapsed().as_secs_f64());
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProbeOutcome, ThreatLevel};
    use crate::notify::{MemorySink, Notifier};
    use crate::observability::StructuredLogger;
    use crate::policy::{AgentReport, PolicyKind, PolicyLimits};
    use crate::remediation::{Remediator, SimulatedActuator};
    use crate::store::{MemoryStore, Scope};
    use crate::testing::{ScriptedMetricsSource, ScriptedProber};
    use chrono::Utc;
    use std::time::Duration;

    struct Fixture {
        cycle: AgentCycle,
        machine: Arc<EscalationMachine>,
        prober: Arc<ScriptedProber>,
        source: Arc<ScriptedMetricsSource>,
        store: Arc<MemoryStore>,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(TargetRegistry::default_fleet());
        let store = Arc::new(MemoryStore::new());
        let prober = Arc::new(ScriptedProber::healthy());
        let source = Arc::new(ScriptedMetricsSource::new());
        let notifier = Notifier::new(Arc::new(MemorySink::new()));
        let remediator = Remediator::new(
            Arc::new(SimulatedActuator::new(notifier.clone(), Duration::ZERO)),
            Duration::ZERO,
            StructuredLogger::new("test"),
        );
        let machine = Arc::new(EscalationMachine::new(
            store.clone(),
            registry.clone(),
            notifier,
            remediator,
            true,
            StructuredLogger::new("test"),
        ));
        let cycle = AgentCycle::new(
            registry,
            prober.clone(),
            PolicyEvaluator::new(source.clone(), PolicyLimits::default()),
            machine.clone(),
            store.clone(),
        );
        Fixture {
            cycle,
            machine,
            prober,
            source,
            store,
        }
    }

    #[tokio::test]
    async fn test_pass_over_default_agents() {
        let f = fixture();
        let now = Utc::now();
        f.source.set(
            "deployment-coordinator",
            PolicyKind::DeploymentRate,
            AgentReport::Deployments((0..11).map(|i| Some(now - chrono::Duration::minutes(i))).collect()),
        );
        f.source
            .set("cost-optimizer", PolicyKind::DailyCost, AgentReport::DailyCost(3.5));
        f.prober.set(
            "http://worker-health-monitor:6003/health",
            ProbeOutcome::failed("connection refused"),
        );

        let summary = f.cycle.run().await.unwrap();
        assert_eq!(summary.targets, 3);
        assert_eq!(summary.suspicious, 2);
        assert_eq!(summary.failures, 0);

        let coordinator = f
            .store
            .get_status(Scope::Agent, "deployment-coordinator")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(coordinator.status, Status::Suspicious);

        let optimizer = f
            .store
            .get_status(Scope::Agent, "cost-optimizer")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(optimizer.status, Status::Healthy);
        assert_eq!(optimizer.threat_level, Some(ThreatLevel::Low));

        let monitor = f
            .store
            .get_status(Scope::Agent, "worker-health-monitor")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(monitor.status, Status::Suspicious);
        assert_eq!(monitor.threat_level, Some(ThreatLevel::High));
    }

    #[tokio::test]
    async fn test_stopped_agent_is_not_probed() {
        let f = fixture();
        f.machine.emergency_stop("cost-optimizer").await.unwrap();

        let agent = TargetRegistry::default_fleet()
            .agent("cost-optimizer")
            .cloned()
            .unwrap();
        let status = f.cycle.supervise(&agent).await.unwrap();

        assert_eq!(status, Status::Stopped);
        assert_eq!(f.prober.calls(), 0);
    }
}
