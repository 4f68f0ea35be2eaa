//! Best-effort evaluation of all policies that apply to an agent

use super::{AgentMetricsSource, Finding, PolicyKind, PolicyLimits};
use crate::models::Target;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// Runs the category's policy strategies against live agent metrics.
///
/// A fetch failure is logged and yields no finding; it is never an error
/// to the caller. Several findings may be returned from one pass.
#[derive(Clone)]
pub struct PolicyEvaluator {
    source: Arc<dyn AgentMetricsSource>,
    limits: PolicyLimits,
}

impl PolicyEvaluator {
    pub fn new(source: Arc<dyn AgentMetricsSource>, limits: PolicyLimits) -> Self {
        Self { source, limits }
    }

    pub fn limits(&self) -> &PolicyLimits {
        &self.limits
    }

    pub async fn evaluate(&self, agent: &Target) -> Vec<Finding> {
        self.evaluate_at(agent, Utc::now()).await
    }

    /// Evaluate with an explicit "now" for the trailing windows
    pub async fn evaluate_at(&self, agent: &Target, now: DateTime<Utc>) -> Vec<Finding> {
        let mut findings = Vec::new();

        for kind in PolicyKind::for_category(agent.category) {
            let report = match self.source.fetch(agent, *kind).await {
                Ok(report) => report,
                Err(e) => {
                    warn!(
                        agent = %agent.name,
                        policy = kind.policy_name(),
                        error = %e,
                        "Failed to fetch agent metrics, skipping policy"
                    );
                    continue;
                }
            };

            match kind.judge(&report, now, &self.limits) {
                Some(finding) => findings.push(finding),
                None => debug!(agent = %agent.name, policy = kind.policy_name(), "Policy satisfied"),
            }
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use crate::policy::AgentReport;
    use anyhow::Result;
    use async_trait::async_trait;

    struct FixedSource(Option<AgentReport>);

    #[async_trait]
    impl AgentMetricsSource for FixedSource {
        async fn fetch(&self, _agent: &Target, _kind: PolicyKind) -> Result<AgentReport> {
            self.0
                .clone()
                .ok_or_else(|| anyhow::anyhow!("connection refused"))
        }
    }

    fn evaluator(report: Option<AgentReport>) -> PolicyEvaluator {
        PolicyEvaluator::new(Arc::new(FixedSource(report)), PolicyLimits::default())
    }

    #[tokio::test]
    async fn test_orchestration_agent_over_limit() {
        let now = Utc::now();
        let started = (0..11)
            .map(|i| Some(now - chrono::Duration::minutes(i)))
            .collect();
        let agent = Target::new("deployment-coordinator", "http://dc:6001", Category::Orchestration);

        let findings = evaluator(Some(AgentReport::Deployments(started)))
            .evaluate_at(&agent, now)
            .await;

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].policy, "max_deployments_per_hour");
        assert!(findings[0].flags_suspicious);
    }

    #[tokio::test]
    async fn test_fetch_failure_yields_nothing() {
        let agent = Target::new("cost-optimizer", "http://co:6002", Category::Analytics);
        assert!(evaluator(None).evaluate(&agent).await.is_empty());
    }

    #[tokio::test]
    async fn test_web_category_has_no_checks() {
        let agent = Target::new("hub", "https://hub.example", Category::Web);
        let findings = evaluator(Some(AgentReport::DailyCost(1_000.0)))
            .evaluate(&agent)
            .await;
        assert!(findings.is_empty());
    }
}
