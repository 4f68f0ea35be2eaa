//! Supervisor configuration
//!
//! An optional file (path from `SUPERVISOR_CONFIG`, default
//! `supervisor.toml`) layered under `SUPERVISOR_*` environment variables.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use supervisor_lib::{
    notify::WebhookConfig,
    policy::PolicyLimits,
    registry::{default_agents, default_workers},
    scheduler::LoopConfig,
    SupervisorConfig, Target, TargetRegistry,
};

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "SUPERVISOR_CONFIG";

pub const DEFAULT_CONFIG_PATH: &str = "supervisor.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct SupervisorSettings {
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Port for the query and control API
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    #[serde(default = "default_check_backoff")]
    pub check_backoff_secs: u64,

    #[serde(default = "default_supervision_interval")]
    pub supervision_interval_secs: u64,

    #[serde(default = "default_supervision_backoff")]
    pub supervision_backoff_secs: u64,

    /// Per-attempt bound on worker probes
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Bound on agent liveness and metrics requests
    #[serde(default = "default_agent_timeout")]
    pub agent_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub emergency_stop_enabled: bool,

    /// Chat webhook for alerts; alerts go to the log when unset
    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default = "default_remediation_delay")]
    pub remediation_delay_ms: u64,

    #[serde(default)]
    pub remediation_cooldown_secs: u64,

    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,

    #[serde(default = "default_workers")]
    pub workers: Vec<Target>,

    #[serde(default = "default_agents")]
    pub agents: Vec<Target>,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "fleet-supervisor".to_string())
}

fn default_api_port() -> u16 {
    6004
}

fn default_check_interval() -> u64 {
    300
}

fn default_check_backoff() -> u64 {
    60
}

fn default_supervision_interval() -> u64 {
    60
}

fn default_supervision_backoff() -> u64 {
    30
}

fn default_probe_timeout() -> u64 {
    30
}

fn default_agent_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_remediation_delay() -> u64 {
    2000
}

impl SupervisorSettings {
    /// Load from the file named by `SUPERVISOR_CONFIG` and the environment
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    /// Load from `path` (optional) and the environment
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix("SUPERVISOR").try_parsing(true))
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

        config
            .try_deserialize()
            .context("Invalid supervisor configuration")
    }

    /// Validated fleet description
    pub fn registry(&self) -> Result<TargetRegistry> {
        TargetRegistry::new(self.workers.clone(), self.agents.clone())
    }

    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            instance_name: self.instance_name.clone(),
            worker_loop: LoopConfig {
                interval: Duration::from_secs(self.check_interval_secs),
                backoff: Duration::from_secs(self.check_backoff_secs),
            },
            agent_loop: LoopConfig {
                interval: Duration::from_secs(self.supervision_interval_secs),
                backoff: Duration::from_secs(self.supervision_backoff_secs),
            },
            emergency_stop_enabled: self.emergency_stop_enabled,
            remediation_cooldown: Duration::from_secs(self.remediation_cooldown_secs),
            limits: PolicyLimits::default(),
        }
    }

    pub fn webhook(&self) -> Option<WebhookConfig> {
        self.webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(WebhookConfig::new)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_timeout_secs)
    }

    pub fn remediation_delay(&self) -> Duration {
        Duration::from_millis(self.remediation_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use supervisor_lib::Category;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SupervisorSettings::load_from(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(settings.api_port, 6004);
        assert_eq!(settings.check_interval_secs, 300);
        assert_eq!(settings.supervision_interval_secs, 60);
        assert!(settings.emergency_stop_enabled);
        assert!(settings.webhook().is_none());
        assert_eq!(settings.workers.len(), 6);
        assert_eq!(settings.agents.len(), 3);
        assert!(settings.registry().is_ok());

        let config = settings.supervisor_config();
        assert_eq!(config.worker_loop.backoff, Duration::from_secs(60));
        assert_eq!(config.agent_loop.backoff, Duration::from_secs(30));
        assert!(config.remediation_cooldown.is_zero());
    }

    #[test]
    fn test_file_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
api_port = 7000
emergency_stop_enabled = false
webhook_url = "https://hooks.example/T000"
remediation_cooldown_secs = 120

[[workers]]
name = "hub"
url = "https://hub.example/health"
category = "web"

[[agents]]
name = "cost-optimizer"
url = "http://localhost:6002"
category = "analytics"
"#
        )
        .unwrap();

        let settings = SupervisorSettings::load_from(file.path()).unwrap();
        assert_eq!(settings.api_port, 7000);
        assert!(!settings.emergency_stop_enabled);
        assert_eq!(settings.webhook().unwrap().url, "https://hooks.example/T000");
        assert_eq!(settings.workers.len(), 1);
        assert_eq!(settings.agents[0].category, Category::Analytics);
        assert_eq!(
            settings.supervisor_config().remediation_cooldown,
            Duration::from_secs(120)
        );
    }

    #[test]
    fn test_invalid_target_url_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[[workers]]
name = "hub"
url = "hub.example"
category = "web"
"#
        )
        .unwrap();

        let settings = SupervisorSettings::load_from(file.path()).unwrap();
        assert!(settings.registry().is_err());
    }
}
