//! Supervisor facade
//!
//! Wires the registry, store and collaborators into the two supervision
//! loops and exposes the query and control operations used by the API.

use crate::error::SupervisorError;
use crate::escalation::{EscalationMachine, StopReceipt};
use crate::health::{components, HealthRegistry, HealthResponse, ReadinessResponse};
use crate::models::PolicyViolation;
use crate::notify::Notifier;
use crate::observability::StructuredLogger;
use crate::policy::{AgentMetricsSource, PolicyEvaluator, PolicyLimits};
use crate::probe::Prober;
use crate::registry::TargetRegistry;
use crate::remediation::{RemediationActuator, Remediator};
use crate::scheduler::{AgentCycle, Cycle, CycleLoopBuilder, LoopConfig, WorkerCycle};
use crate::store::{StatusStore, StoreError};
use crate::views::{self, AgentDetail, AgentStatus, FleetMetrics, TargetStatus, WorkerDetail};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Runtime settings for a supervisor instance
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub instance_name: String,
    pub worker_loop: LoopConfig,
    pub agent_loop: LoopConfig,
    pub emergency_stop_enabled: bool,
    /// Per-target remediation guard; zero disables it
    pub remediation_cooldown: Duration,
    pub limits: PolicyLimits,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            instance_name: "fleet-supervisor".to_string(),
            worker_loop: LoopConfig::workers(),
            agent_loop: LoopConfig::agents(),
            emergency_stop_enabled: true,
            remediation_cooldown: Duration::ZERO,
            limits: PolicyLimits::default(),
        }
    }
}

/// External systems the supervisor talks to
pub struct Collaborators {
    pub worker_prober: Arc<dyn Prober>,
    pub agent_prober: Arc<dyn Prober>,
    pub metrics_source: Arc<dyn AgentMetricsSource>,
    pub notifier: Notifier,
    pub actuator: Arc<dyn RemediationActuator>,
}

pub struct Supervisor {
    config: SupervisorConfig,
    registry: Arc<TargetRegistry>,
    store: Arc<dyn StatusStore>,
    notifier: Notifier,
    machine: Arc<EscalationMachine>,
    worker_cycle: WorkerCycle,
    agent_cycle: AgentCycle,
    health: HealthRegistry,
    logger: StructuredLogger,
}

impl Supervisor {
    pub fn new(
        config: SupervisorConfig,
        registry: TargetRegistry,
        store: Arc<dyn StatusStore>,
        collaborators: Collaborators,
    ) -> Self {
        let registry = Arc::new(registry);
        let logger = StructuredLogger::new(config.instance_name.clone());
        let remediator = Remediator::new(
            collaborators.actuator,
            config.remediation_cooldown,
            logger.clone(),
        );
        let machine = Arc::new(EscalationMachine::new(
            store.clone(),
            registry.clone(),
            collaborators.notifier.clone(),
            remediator.clone(),
            config.emergency_stop_enabled,
            logger.clone(),
        ));
        let worker_cycle = WorkerCycle::new(
            registry.clone(),
            collaborators.worker_prober,
            store.clone(),
            collaborators.notifier.clone(),
            remediator,
            logger.clone(),
        );
        let agent_cycle = AgentCycle::new(
            registry.clone(),
            collaborators.agent_prober,
            PolicyEvaluator::new(collaborators.metrics_source, config.limits.clone()),
            machine.clone(),
            store.clone(),
        );

        Self {
            config,
            registry,
            store,
            notifier: collaborators.notifier,
            machine,
            worker_cycle,
            agent_cycle,
            health: HealthRegistry::new(),
            logger,
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    /// Spawn both supervision loops
    pub async fn start(&self) -> SupervisorHandle {
        let (shutdown_tx, _) = broadcast::channel(1);
        self.health.register(components::STORE).await;

        let loops = [
            CycleLoopBuilder::new(self.config.worker_loop.clone())
                .cycle(Arc::new(self.worker_cycle.clone()) as Arc<dyn Cycle>)
                .component(components::WORKER_CHECKS),
            CycleLoopBuilder::new(self.config.agent_loop.clone())
                .cycle(Arc::new(self.agent_cycle.clone()) as Arc<dyn Cycle>)
                .component(components::AGENT_SUPERVISION),
        ];

        let mut tasks = Vec::with_capacity(loops.len());
        for builder in loops {
            match builder
                .health(self.health.clone())
                .flush_store(self.store.clone())
                .build()
            {
                Ok(cycle_loop) => tasks.push(tokio::spawn(cycle_loop.run(shutdown_tx.subscribe()))),
                Err(e) => warn!(error = %e, "Failed to build supervision loop"),
            }
        }

        self.health.set_ready(true).await;
        SupervisorHandle { shutdown_tx, tasks }
    }

    /// Start a detached worker check; returns the number of workers queued
    pub fn trigger_worker_check(&self) -> usize {
        spawn_detached(self.worker_cycle.clone())
    }

    /// Start a detached agent pass; returns the number of agents queued
    pub fn trigger_agent_monitoring(&self) -> usize {
        spawn_detached(self.agent_cycle.clone())
    }

    pub async fn emergency_stop(&self, name: &str) -> Result<StopReceipt, SupervisorError> {
        self.machine.emergency_stop(name).await
    }

    /// Component health, refreshing the store's entry first
    pub async fn health(&self) -> HealthResponse {
        match self.store.ping().await {
            Ok(()) => self.health.set_healthy(components::STORE).await,
            Err(e) => {
                self.health
                    .set_unhealthy(components::STORE, e.to_string())
                    .await
            }
        }
        self.health.health().await
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        self.health.readiness().await
    }

    pub async fn workers(&self) -> Result<Vec<TargetStatus>, StoreError> {
        views::list_workers(&self.registry, self.store.as_ref()).await
    }

    pub async fn worker(&self, name: &str) -> Result<WorkerDetail, SupervisorError> {
        views::worker_detail(&self.registry, self.store.as_ref(), name).await
    }

    pub async fn agents(&self) -> Result<Vec<AgentStatus>, StoreError> {
        views::list_agents(&self.registry, self.store.as_ref()).await
    }

    pub async fn agent(&self, name: &str) -> Result<AgentDetail, SupervisorError> {
        views::agent_detail(&self.registry, self.store.as_ref(), name).await
    }

    pub async fn violations(&self, hours: i64) -> Result<Vec<PolicyViolation>, StoreError> {
        views::violations_since(&self.registry, self.store.as_ref(), hours, Utc::now()).await
    }

    pub async fn metrics(&self) -> Result<FleetMetrics, StoreError> {
        views::fleet_metrics(&self.registry, self.store.as_ref(), Utc::now()).await
    }

    /// Persist pending store writes
    pub async fn flush(&self) -> Result<(), StoreError> {
        self.store.flush().await
    }
}

fn spawn_detached<C: Cycle + Clone>(cycle: C) -> usize {
    let count = cycle.target_count();
    tokio::spawn(async move {
        match cycle.run().await {
            Ok(summary) => info!(
                cycle = cycle.name(),
                targets = summary.targets,
                failures = summary.failures,
                "Manual cycle complete"
            ),
            Err(e) => warn!(cycle = cycle.name(), error = %e, "Manual cycle failed"),
        }
    });
    count
}

/// Owner of the running supervision loops
pub struct SupervisorHandle {
    shutdown_tx: broadcast::Sender<()>,
    tasks: Vec<JoinHandle<()>>,
}

impl SupervisorHandle {
    /// Signal every loop and wait for it to finish its current cycle
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Supervision loop ended abnormally");
            }
        }
    }
}
