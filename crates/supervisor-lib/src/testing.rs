//! Test doubles for the supervisor's collaborator seams

use crate::models::{HistoryEntry, PolicyViolation, ProbeOutcome, StatusRecord, Target};
use crate::policy::{AgentMetricsSource, AgentReport, PolicyKind};
use crate::probe::Prober;
use crate::store::{Scope, StatusStore, StoreError};
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Prober answering from a per-URL script
pub struct ScriptedProber {
    outcomes: DashMap<String, ProbeOutcome>,
    fallback: ProbeOutcome,
    calls: AtomicUsize,
}

impl ScriptedProber {
    pub fn new(fallback: ProbeOutcome) -> Self {
        Self {
            outcomes: DashMap::new(),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every unscripted URL answers 200 in 10ms
    pub fn healthy() -> Self {
        Self::new(ProbeOutcome::responded(200, 10.0))
    }

    pub fn set(&self, url: impl Into<String>, outcome: ProbeOutcome) {
        self.outcomes.insert(url.into(), outcome);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .get(url)
            .map(|o| o.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Metrics source answering from a per-agent script; unscripted fetches fail
#[derive(Default)]
pub struct ScriptedMetricsSource {
    reports: DashMap<(String, PolicyKind), AgentReport>,
}

impl ScriptedMetricsSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, agent: impl Into<String>, kind: PolicyKind, report: AgentReport) {
        self.reports.insert((agent.into(), kind), report);
    }
}

#[async_trait]
impl AgentMetricsSource for ScriptedMetricsSource {
    async fn fetch(&self, agent: &Target, kind: PolicyKind) -> Result<AgentReport> {
        self.reports
            .get(&(agent.name.clone(), kind))
            .map(|r| r.clone())
            .ok_or_else(|| anyhow::anyhow!("no report scripted for {}", agent.name))
    }
}

/// Store whose every call fails as if the backend were unreachable
#[derive(Debug, Default)]
pub struct UnavailableStore;

impl UnavailableStore {
    fn err() -> StoreError {
        StoreError::Unavailable("connection refused".to_string())
    }
}

#[async_trait]
impl StatusStore for UnavailableStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Err(Self::err())
    }

    async fn get_status(
        &self,
        _scope: Scope,
        _name: &str,
    ) -> Result<Option<StatusRecord>, StoreError> {
        Err(Self::err())
    }

    async fn put_status(
        &self,
        _scope: Scope,
        _name: &str,
        _record: StatusRecord,
    ) -> Result<(), StoreError> {
        Err(Self::err())
    }

    async fn push_history(&self, _name: &str, _entry: HistoryEntry) -> Result<(), StoreError> {
        Err(Self::err())
    }

    async fn history(&self, _name: &str, _limit: usize) -> Result<Vec<HistoryEntry>, StoreError> {
        Err(Self::err())
    }

    async fn push_violation(&self, _violation: PolicyViolation) -> Result<(), StoreError> {
        Err(Self::err())
    }

    async fn violations(
        &self,
        _agent: &str,
        _limit: usize,
    ) -> Result<Vec<PolicyViolation>, StoreError> {
        Err(Self::err())
    }
}
