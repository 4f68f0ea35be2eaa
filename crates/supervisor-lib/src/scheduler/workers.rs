//! Worker health checks

use super::{Cycle, CycleSummary};
use crate::classifier::classify;
use crate::models::{HistoryEntry, Status, StatusRecord, Target};
use crate::notify::{AlertLevel, Notifier};
use crate::observability::{StructuredLogger, SupervisorMetrics};
use crate::probe::Prober;
use crate::registry::TargetRegistry;
use crate::remediation::{RemediationAction, Remediator};
use crate::store::{Scope, StatusStore, StoreError};
use crate::uptime::UptimeEstimator;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Probes every worker once, concurrently
#[derive(Clone)]
pub struct WorkerCycle {
    registry: Arc<TargetRegistry>,
    prober: Arc<dyn Prober>,
    store: Arc<dyn StatusStore>,
    notifier: Notifier,
    remediator: Remediator,
    estimator: UptimeEstimator,
    metrics: SupervisorMetrics,
    logger: StructuredLogger,
}

impl WorkerCycle {
    pub fn new(
        registry: Arc<TargetRegistry>,
        prober: Arc<dyn Prober>,
        store: Arc<dyn StatusStore>,
        notifier: Notifier,
        remediator: Remediator,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            registry,
            prober,
            store,
            notifier,
            remediator,
            estimator: UptimeEstimator::new(),
            metrics: SupervisorMetrics::new(),
            logger,
        }
    }

    /// Probe, classify, persist and react for a single worker
    pub async fn check_target(&self, target: &Target) -> Result<Status, StoreError> {
        let outcome = self.prober.probe(&target.url).await;
        let status = classify(&outcome);
        let now = Utc::now();
        let response_time_ms = outcome
            .response_time_ms
            .filter(|ms| ms.is_finite() && *ms >= 0.0)
            .unwrap_or(0.0);

        let previous = self
            .store
            .get_status(Scope::Worker, &target.name)
            .await?
            .map(|r| r.uptime_percent);
        let uptime_percent = if outcome.succeeded {
            self.estimator.observe_status(previous, status)
        } else {
            self.estimator.observe_unreachable(previous)
        };

        let record = StatusRecord {
            status,
            response_time_ms,
            last_check: Some(now),
            uptime_percent,
            error: outcome.error.clone().unwrap_or_default(),
            threat_level: None,
        };
        self.store
            .put_status(Scope::Worker, &target.name, record)
            .await?;
        self.store
            .push_history(
                &target.name,
                HistoryEntry {
                    timestamp: now,
                    status,
                    status_code: outcome.status_code,
                    response_time_ms,
                },
            )
            .await?;

        self.metrics.inc_probe_result(status);
        if outcome.succeeded {
            self.metrics.observe_probe_latency(response_time_ms / 1000.0);
        }

        if status == Status::Down {
            let error = outcome.error.as_deref().unwrap_or_default();
            self.logger
                .log_target_down(&target.name, outcome.status_code, error);

            let message = match outcome.status_code {
                Some(code) if outcome.succeeded => {
                    format!("Worker {} is DOWN (status {})", target.name, code)
                }
                _ => format!("Worker {} UNREACHABLE: {}", target.name, error),
            };
            self.notifier.send(AlertLevel::Error, message).await;
            self.remediator
                .remediate(target, RemediationAction::Restart)
                .await;
        } else {
            debug!(target = %target.name, status = %status, "Worker checked");
        }

        Ok(status)
    }
}

#[async_trait]
impl Cycle for WorkerCycle {
    fn name(&self) -> &'static str {
        "workers"
    }

    fn target_count(&self) -> usize {
        self.registry.workers().len()
    }

    async fn run(&self) -> Result<CycleSummary> {
        self.store
            .ping()
            .await
            .context("status store unreachable")?;

        let start = Instant::now();
        let mut set = JoinSet::new();
        for target in self.registry.workers().iter().cloned() {
            let cycle = self.clone();
            set.spawn(async move {
                let result = cycle.check_target(&target).await;
                (target.name, result)
            });
        }

        let mut summary = CycleSummary {
            targets: self.registry.workers().len(),
            ..Default::default()
        };
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(Status::Down))) => summary.down += 1,
                Ok((_, Ok(_))) => {}
                Ok((name, Err(e))) => {
                    summary.failures += 1;
                    warn!(target = %name, error = %e, "Worker check failed");
                }
                Err(e) => {
                    summary.failures += 1;
                    warn!(error = %e, "Worker check task panicked");
                }
            }
        }

        self.metrics.set_targets_down(summary.down as i64);
        self.metrics
            .observe_cycle_duration(self.name(), start.elapsed().as_secs_f64());
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, ProbeOutcome};
    use crate::notify::MemorySink;
    use crate::remediation::SimulatedActuator;
    use crate::store::MemoryStore;
    use crate::testing::{ScriptedProber, UnavailableStore};
    use std::time::Duration;

    fn workers() -> Vec<Target> {
        vec![
            Target::new("hub", "https://hub.example/health", Category::Web),
            Target::new("blog", "https://blog.example/health", Category::Web),
            Target::new("api", "https://api.example/health", Category::Api),
        ]
    }

    fn cycle(
        prober: Arc<ScriptedProber>,
        store: Arc<dyn StatusStore>,
        sink: Arc<MemorySink>,
    ) -> WorkerCycle {
        let notifier = Notifier::new(sink);
        let remediator = Remediator::new(
            Arc::new(SimulatedActuator::new(notifier.clone(), Duration::ZERO)),
            Duration::ZERO,
            StructuredLogger::new("test"),
        );
        WorkerCycle::new(
            Arc::new(TargetRegistry::new(workers(), vec![]).unwrap()),
            prober,
            store,
            notifier,
            remediator,
            StructuredLogger::new("test"),
        )
    }

    #[tokio::test]
    async fn test_cycle_classifies_and_records_every_worker() {
        let prober = Arc::new(ScriptedProber::healthy());
        prober.set(
            "https://blog.example/health",
            ProbeOutcome::responded(200, 1500.0),
        );
        prober.set("https://api.example/health", ProbeOutcome::responded(503, 20.0));
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(MemorySink::new());

        let summary = cycle(prober.clone(), store.clone(), sink.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.targets, 3);
        assert_eq!(summary.down, 1);
        assert_eq!(summary.failures, 0);
        assert_eq!(prober.calls(), 3);

        let hub = store.get_status(Scope::Worker, "hub").await.unwrap().unwrap();
        assert_eq!(hub.status, Status::Healthy);
        let blog = store.get_status(Scope::Worker, "blog").await.unwrap().unwrap();
        assert_eq!(blog.status, Status::Degraded);
        let api = store.get_status(Scope::Worker, "api").await.unwrap().unwrap();
        assert_eq!(api.status, Status::Down);
        assert!((api.uptime_percent - 95.0).abs() < 1e-9);

        let history = store.history("api", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status_code, Some(503));

        let alerts = sink.alerts();
        assert!(alerts
            .iter()
            .any(|a| a.message == "Worker api is DOWN (status 503)"));
        assert!(alerts
            .iter()
            .any(|a| a.message.contains("Auto-restarting worker: api")));
    }

    #[tokio::test]
    async fn test_unreachable_worker_uptime_sequence() {
        let prober = Arc::new(ScriptedProber::healthy());
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(MemorySink::new());
        let cycle = cycle(prober.clone(), store.clone(), sink.clone());
        let hub = &workers()[0];

        cycle.check_target(hub).await.unwrap();
        let uptime = |store: Arc<MemoryStore>| async move {
            store
                .get_status(Scope::Worker, "hub")
                .await
                .unwrap()
                .unwrap()
                .uptime_percent
        };
        assert!((uptime(store.clone()).await - 100.0).abs() < 1e-9);

        prober.set(&hub.url, ProbeOutcome::failed("timed out: deadline elapsed"));
        assert_eq!(cycle.check_target(hub).await.unwrap(), Status::Down);
        assert!((uptime(store.clone()).await - 95.0).abs() < 1e-9);
        assert!(sink
            .alerts()
            .iter()
            .any(|a| a.message.starts_with("Worker hub UNREACHABLE")));

        prober.set(&hub.url, ProbeOutcome::responded(200, 40.0));
        assert_eq!(cycle.check_target(hub).await.unwrap(), Status::Healthy);
        assert!((uptime(store.clone()).await - 95.25).abs() < 1e-9);

        let history = store.history("hub", 10).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].status, Status::Healthy);
        assert_eq!(history[1].status_code, None);
    }

    #[tokio::test]
    async fn test_unreachable_store_fails_the_cycle() {
        let prober = Arc::new(ScriptedProber::healthy());
        let result = cycle(
            prober.clone(),
            Arc::new(UnavailableStore),
            Arc::new(MemorySink::new()),
        )
        .run()
        .await;

        assert!(result.is_err());
        assert_eq!(prober.calls(), 0);
    }
}
