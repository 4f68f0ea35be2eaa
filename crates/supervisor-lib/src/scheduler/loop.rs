//! Supervision loop
//!
//! Runs a cycle immediately, then again after every interval. A failed
//! cycle is logged and retried after the shorter backoff; the loop never
//! exits on its own. Shutdown is observed between cycles and while
//! sleeping, never in the middle of a pass.

use super::Cycle;
use crate::health::HealthRegistry;
use crate::observability::SupervisorMetrics;
use crate::store::StatusStore;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Timing of a supervision loop
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Delay after a successful cycle
    pub interval: Duration,
    /// Delay after a failed cycle
    pub backoff: Duration,
}

impl LoopConfig {
    /// Worker checks: every 5 minutes, 1 minute after a failure
    pub fn workers() -> Self {
        Self {
            interval: Duration::from_secs(300),
            backoff: Duration::from_secs(60),
        }
    }

    /// Agent supervision: every minute, 30 seconds after a failure
    pub fn agents() -> Self {
        Self {
            interval: Duration::from_secs(60),
            backoff: Duration::from_secs(30),
        }
    }
}

pub struct CycleLoop {
    cycle: Arc<dyn Cycle>,
    config: LoopConfig,
    component: &'static str,
    health: HealthRegistry,
    store: Option<Arc<dyn StatusStore>>,
    metrics: SupervisorMetrics,
}

impl CycleLoop {
    pub fn new(
        cycle: Arc<dyn Cycle>,
        config: LoopConfig,
        component: &'static str,
        health: HealthRegistry,
    ) -> Self {
        Self {
            cycle,
            config,
            component,
            health,
            store: None,
            metrics: SupervisorMetrics::new(),
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            cycle = self.cycle.name(),
            interval_secs = self.config.interval.as_secs(),
            targets = self.cycle.target_count(),
            "Starting supervision loop"
        );
        self.health.register(self.component).await;

        loop {
            let delay = self.run_once().await;

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.recv() => {
                    info!(cycle = self.cycle.name(), "Shutting down supervision loop");
                    break;
                }
            }
        }
    }

    /// Run one cycle and return how long to wait before the next one
    async fn run_once(&self) -> Duration {
        match self.cycle.run().await {
            Ok(summary) => {
                debug!(
                    cycle = self.cycle.name(),
                    targets = summary.targets,
                    failures = summary.failures,
                    down = summary.down,
                    suspicious = summary.suspicious,
                    "Cycle complete"
                );
                if summary.failures > 0 {
                    self.health
                        .set_degraded(
                            self.component,
                            format!("{} of {} targets failed", summary.failures, summary.targets),
                        )
                        .await;
                } else {
                    self.health.set_healthy(self.component).await;
                }

                if let Some(store) = &self.store {
                    if let Err(e) = store.flush().await {
                        warn!(error = %e, "Failed to flush status store");
                    }
                }
                self.config.interval
            }
            Err(e) => {
                error!(
                    cycle = self.cycle.name(),
                    error = %e,
                    backoff_secs = self.config.backoff.as_secs(),
                    "Cycle failed, backing off"
                );
                self.metrics.inc_cycle_errors(self.cycle.name());
                self.health
                    .set_degraded(self.component, format!("last cycle failed: {:#}", e))
                    .await;
                self.config.backoff
            }
        }
    }
}

/// Builder for a supervision loop
pub struct CycleLoopBuilder {
    cycle: Option<Arc<dyn Cycle>>,
    config: LoopConfig,
    component: Option<&'static str>,
    health: HealthRegistry,
    store: Option<Arc<dyn StatusStore>>,
}

impl CycleLoopBuilder {
    pub fn new(config: LoopConfig) -> Self {
        Self {
            cycle: None,
            config,
            component: None,
            health: HealthRegistry::new(),
            store: None,
        }
    }

    pub fn cycle(mut self, cycle: Arc<dyn Cycle>) -> Self {
        self.cycle = Some(cycle);
        self
    }

    /// Health component the loop reports into
    pub fn component(mut self, name: &'static str) -> Self {
        self.component = Some(name);
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = health;
        self
    }

    /// Store flushed after every successful cycle
    pub fn flush_store(mut self, store: Arc<dyn StatusStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<CycleLoop> {
        let cycle = self
            .cycle
            .ok_or_else(|| anyhow::anyhow!("Cycle is required"))?;
        let component = self.component.unwrap_or(cycle.name());

        let mut cycle_loop = CycleLoop::new(cycle, self.config, component, self.health);
        cycle_loop.store = self.store;
        Ok(cycle_loop)
    }
}
