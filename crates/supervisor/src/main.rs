//! Fleet Supervisor - liveness, policy and escalation control plane
//!
//! Probes the worker fleet, supervises autonomous agents and serves the
//! query and control API.

use anyhow::{Context, Result};
use fleet_supervisor::{api, config::SupervisorSettings};
use std::sync::Arc;
use supervisor_lib::{
    notify::{AlertLevel, ConsoleSink, NotificationSink, Notifier, WebhookSink},
    policy::HttpAgentSource,
    probe::HttpProber,
    remediation::SimulatedActuator,
    Collaborators, MemoryStore, StatusStore, Supervisor,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SUPERVISOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting fleet-supervisor");

    let settings = SupervisorSettings::load()?;
    let registry = settings.registry().context("Invalid fleet configuration")?;
    info!(
        instance = %settings.instance_name,
        workers = registry.workers().len(),
        agents = registry.agents().len(),
        "Supervisor configured"
    );

    let store: Arc<dyn StatusStore> = match &settings.snapshot_path {
        Some(path) => Arc::new(
            MemoryStore::with_snapshot(path)
                .with_context(|| format!("Failed to load snapshot {}", path.display()))?,
        ),
        None => Arc::new(MemoryStore::new()),
    };

    let sink: Arc<dyn NotificationSink> = match settings.webhook() {
        Some(webhook) => Arc::new(WebhookSink::new(webhook)?),
        None => {
            warn!("No webhook configured, alerts will be logged only");
            Arc::new(ConsoleSink)
        }
    };
    let notifier = Notifier::new(sink);

    let collaborators = Collaborators {
        worker_prober: Arc::new(HttpProber::new(settings.probe_timeout())?),
        agent_prober: Arc::new(HttpProber::new(settings.agent_timeout())?),
        metrics_source: Arc::new(HttpAgentSource::new(settings.agent_timeout())?),
        notifier: notifier.clone(),
        actuator: Arc::new(SimulatedActuator::new(
            notifier.clone(),
            settings.remediation_delay(),
        )),
    };

    let supervisor = Arc::new(Supervisor::new(
        settings.supervisor_config(),
        registry,
        store,
        collaborators,
    ));

    let logger = supervisor.logger().clone();
    logger.log_startup(
        SUPERVISOR_VERSION,
        supervisor.registry().workers().len(),
        supervisor.registry().agents().len(),
        settings.emergency_stop_enabled,
    );
    notifier
        .send(
            AlertLevel::Info,
            format!(
                "Fleet supervisor {} started: {} workers, {} agents",
                SUPERVISOR_VERSION,
                supervisor.registry().workers().len(),
                supervisor.registry().agents().len()
            ),
        )
        .await;

    let handle = supervisor.start().await;

    let app_state = Arc::new(api::AppState::new(supervisor.clone(), SUPERVISOR_VERSION));
    let mut api_handle = tokio::spawn(api::serve(settings.api_port, app_state));

    let reason = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            "SIGINT received"
        }
        served = &mut api_handle => {
            match served {
                Ok(Ok(())) => "API server stopped",
                Ok(Err(e)) => {
                    error!(error = %e, "API server failed");
                    "API server failed"
                }
                Err(e) => {
                    error!(error = %e, "API server task panicked");
                    "API server panicked"
                }
            }
        }
    };

    logger.log_shutdown(reason);
    api_handle.abort();
    handle.shutdown().await;
    if let Err(e) = supervisor.flush().await {
        warn!(error = %e, "Failed to persist final snapshot");
    }
    info!("Shutdown complete");

    Ok(())
}
