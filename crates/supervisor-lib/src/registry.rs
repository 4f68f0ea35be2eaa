//! Registry of probe targets and supervised agents
//!
//! Loaded once at startup and immutable afterwards.

use crate::models::{Category, Target};
use anyhow::{bail, Context, Result};
use std::collections::HashSet;

/// Static fleet description
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    workers: Vec<Target>,
    agents: Vec<Target>,
}

impl TargetRegistry {
    /// Build a registry, rejecting duplicate names and malformed URLs
    pub fn new(workers: Vec<Target>, agents: Vec<Target>) -> Result<Self> {
        validate("worker", &workers)?;
        validate("agent", &agents)?;
        Ok(Self { workers, agents })
    }

    /// Registry describing the default deployment
    pub fn default_fleet() -> Self {
        Self {
            workers: default_workers(),
            agents: default_agents(),
        }
    }

    pub fn workers(&self) -> &[Target] {
        &self.workers
    }

    pub fn agents(&self) -> &[Target] {
        &self.agents
    }

    pub fn worker(&self, name: &str) -> Option<&Target> {
        self.workers.iter().find(|t| t.name == name)
    }

    pub fn agent(&self, name: &str) -> Option<&Target> {
        self.agents.iter().find(|t| t.name == name)
    }
}

fn validate(kind: &str, targets: &[Target]) -> Result<()> {
    let mut seen = HashSet::new();
    for target in targets {
        if target.name.trim().is_empty() {
            bail!("{} with url {} has an empty name", kind, target.url);
        }
        if !seen.insert(target.name.as_str()) {
            bail!("duplicate {} name: {}", kind, target.name);
        }
        let url = url::Url::parse(&target.url)
            .with_context(|| format!("invalid url for {} {}", kind, target.name))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("{} {} must use http or https, got {}", kind, target.name, url.scheme());
        }
    }
    Ok(())
}

/// Workers probed by default
pub fn default_workers() -> Vec<Target> {
    vec![
        Target::new("hub", "https://jimbo77.com/health", Category::Web),
        Target::new(
            "pumo-api",
            "https://jimbo-like-pumo-api.stolarnia-ams.workers.dev/health",
            Category::Api,
        ),
        Target::new("zen-browser", "https://zen-bro-wser.org/health", Category::Web),
        Target::new("blog", "https://my-bonzo-ai-blog.pages.dev/health", Category::Web),
        Target::new(
            "luc-de-zen-on",
            "https://luc-de-zen-on.pages.dev/health",
            Category::Web,
        ),
        Target::new(
            "agents-orchestrator",
            "https://orchestrator.jimbo77.com/health",
            Category::Orchestration,
        ),
    ]
}

/// Agents supervised by default; URLs are service base addresses
pub fn default_agents() -> Vec<Target> {
    vec![
        Target::new(
            "deployment-coordinator",
            "http://deployment-coordinator:6001",
            Category::Orchestration,
        ),
        Target::new("cost-optimizer", "http://cost-optimizer:6002", Category::Analytics),
        Target::new(
            "worker-health-monitor",
            "http://worker-health-monitor:6003",
            Category::Monitoring,
        ),
    ]
}
