//! In-memory status store with optional JSON snapshot persistence

use super::{BoundedLog, Scope, StatusStore, StoreError};
use crate::models::{HistoryEntry, PolicyViolation, StatusRecord, HISTORY_CAP, VIOLATION_CAP};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// On-disk layout: one record map per scope and one capped list per name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub workers: HashMap<String, StatusRecord>,
    #[serde(default)]
    pub agents: HashMap<String, StatusRecord>,
    #[serde(default)]
    pub history: HashMap<String, Vec<HistoryEntry>>,
    #[serde(default)]
    pub violations: HashMap<String, Vec<PolicyViolation>>,
}

/// Process-local status store backed by concurrent maps
pub struct MemoryStore {
    records: DashMap<(Scope, String), StatusRecord>,
    history: DashMap<String, BoundedLog<HistoryEntry>>,
    violations: DashMap<String, BoundedLog<PolicyViolation>>,
    snapshot_path: Option<PathBuf>,
    dirty: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            history: DashMap::new(),
            violations: DashMap::new(),
            snapshot_path: None,
            dirty: AtomicBool::new(false),
        }
    }

    /// Create a store that loads from and flushes to `path`
    pub fn with_snapshot(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut store = Self::new();

        if path.exists() {
            let data = std::fs::read(&path)?;
            let snapshot: StoreSnapshot = serde_json::from_slice(&data)?;
            store.restore(snapshot);
            info!(path = %path.display(), records = store.records.len(), "Loaded store snapshot");
        }

        store.snapshot_path = Some(path);
        Ok(store)
    }

    fn restore(&mut self, snapshot: StoreSnapshot) {
        for (name, record) in snapshot.workers {
            self.records.insert((Scope::Worker, name), record);
        }
        for (name, record) in snapshot.agents {
            self.records.insert((Scope::Agent, name), record);
        }
        for (name, entries) in snapshot.history {
            self.history
                .insert(name, BoundedLog::from_newest_first(entries, HISTORY_CAP));
        }
        for (name, entries) in snapshot.violations {
            self.violations
                .insert(name, BoundedLog::from_newest_first(entries, VIOLATION_CAP));
        }
    }

    /// Copy the current contents into a serializable snapshot
    pub fn snapshot(&self) -> StoreSnapshot {
        let mut snapshot = StoreSnapshot::default();
        for entry in self.records.iter() {
            let (scope, name) = entry.key();
            let target = match scope {
                Scope::Worker => &mut snapshot.workers,
                Scope::Agent => &mut snapshot.agents,
            };
            target.insert(name.clone(), entry.value().clone());
        }
        for entry in self.history.iter() {
            snapshot
                .history
                .insert(entry.key().clone(), entry.value().recent(usize::MAX));
        }
        for entry in self.violations.iter() {
            snapshot
                .violations
                .insert(entry.key().clone(), entry.value().recent(usize::MAX));
        }
        snapshot
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    async fn write_snapshot(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_vec(&self.snapshot())?;

        // Readers only ever see a complete file
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &json).await?;
        tokio::fs::rename(&temp_path, path).await?;

        debug!(path = %path.display(), bytes = json.len(), "Store snapshot written");
        Ok(())
    }
}

#[async_trait]
impl StatusStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get_status(
        &self,
        scope: Scope,
        name: &str,
    ) -> Result<Option<StatusRecord>, StoreError> {
        Ok(self
            .records
            .get(&(scope, name.to_string()))
            .map(|r| r.value().clone()))
    }

    async fn put_status(
        &self,
        scope: Scope,
        name: &str,
        record: StatusRecord,
    ) -> Result<(), StoreError> {
        self.records.insert((scope, name.to_string()), record);
        self.mark_dirty();
        Ok(())
    }

    async fn push_history(&self, name: &str, entry: HistoryEntry) -> Result<(), StoreError> {
        self.history
            .entry(name.to_string())
            .or_insert_with(|| BoundedLog::new(HISTORY_CAP))
            .push(entry);
        self.mark_dirty();
        Ok(())
    }

    async fn history(&self, name: &str, limit: usize) -> Result<Vec<HistoryEntry>, StoreError> {
        Ok(self
            .history
            .get(name)
            .map(|log| log.recent(limit))
            .unwrap_or_default())
    }

    async fn push_violation(&self, violation: PolicyViolation) -> Result<(), StoreError> {
        self.violations
            .entry(violation.agent.clone())
            .or_insert_with(|| BoundedLog::new(VIOLATION_CAP))
            .push(violation);
        self.mark_dirty();
        Ok(())
    }

    async fn violations(
        &self,
        agent: &str,
        limit: usize,
    ) -> Result<Vec<PolicyViolation>, StoreError> {
        Ok(self
            .violations
            .get(agent)
            .map(|log| log.recent(limit))
            .unwrap_or_default())
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let Some(path) = self.snapshot_path.as_deref() else {
            return Ok(());
        };
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        if let Err(e) = self.write_snapshot(path).await {
            self.mark_dirty();
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Severity, Status};
    use chrono::Utc;

    fn history_entry(status: Status, ms: f64) -> HistoryEntry {
        HistoryEntry {
            timestamp: Utc::now(),
            status,
            status_code: Some(200),
            response_time_ms: ms,
        }
    }

    fn violation(agent: &str, policy: &str) -> PolicyViolation {
        PolicyViolation {
            agent: agent.to_string(),
            policy: policy.to_string(),
            severity: Severity::Warning,
            timestamp: Utc::now(),
            details: "details".to_string(),
            action_taken: "Alert sent".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_record_is_none() {
        let store = MemoryStore::new();
        assert!(store.get_status(Scope::Worker, "hub").await.unwrap().is_none());
        assert!(store.history("hub", 20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scopes_are_separate_keyspaces() {
        let store = MemoryStore::new();
        let mut record = StatusRecord::unchecked();
        record.status = Status::Down;
        store.put_status(Scope::Worker, "shared", record).await.unwrap();

        assert!(store.get_status(Scope::Agent, "shared").await.unwrap().is_none());
        let worker = store.get_status(Scope::Worker, "shared").await.unwrap().unwrap();
        assert_eq!(worker.status, Status::Down);
    }

    #[tokio::test]
    async fn test_put_replaces_whole_record() {
        let store = MemoryStore::new();
        let mut first = StatusRecord::unchecked();
        first.error = "boom".to_string();
        store.put_status(Scope::Worker, "hub", first).await.unwrap();
        store
            .put_status(Scope::Worker, "hub", StatusRecord::unchecked())
            .await
            .unwrap();

        let record = store.get_status(Scope::Worker, "hub").await.unwrap().unwrap();
        assert!(record.error.is_empty());
    }

    #[tokio::test]
    async fn test_history_is_capped_and_newest_first() {
        let store = MemoryStore::new();
        for i in 0..150 {
            store
                .push_history("hub", history_entry(Status::Healthy, i as f64))
                .await
                .unwrap();
        }

        let all = store.history("hub", usize::MAX).await.unwrap();
        assert_eq!(all.len(), HISTORY_CAP);
        assert_eq!(all[0].response_time_ms, 149.0);
        assert_eq!(all[HISTORY_CAP - 1].response_time_ms, 50.0);

        let last_twenty = store.history("hub", 20).await.unwrap();
        assert_eq!(last_twenty.len(), 20);
        assert_eq!(last_twenty[19].response_time_ms, 130.0);
    }

    #[tokio::test]
    async fn test_violations_are_capped_per_agent() {
        let store = MemoryStore::new();
        for i in 0..120 {
            store
                .push_violation(violation("cost-optimizer", &format!("p{}", i)))
                .await
                .unwrap();
        }
        store.push_violation(violation("other", "x")).await.unwrap();

        let list = store.violations("cost-optimizer", usize::MAX).await.unwrap();
        assert_eq!(list.len(), VIOLATION_CAP);
        assert_eq!(list[0].policy, "p119");
        assert_eq!(store.violations("other", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_flush_without_snapshot_path_is_noop() {
        let store = MemoryStore::new();
        store
            .put_status(Scope::Agent, "a", StatusRecord::unchecked_agent())
            .await
            .unwrap();
        assert!(store.flush().await.is_ok());
    }

    #[tokio::test]
    async fn test_snapshot_survives_reload() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("state").join("store.json");

        let store = MemoryStore::with_snapshot(&path).unwrap();
        let mut record = StatusRecord::unchecked();
        record.status = Status::Degraded;
        record.uptime_percent = 95.0;
        store.put_status(Scope::Worker, "blog", record).await.unwrap();
        store
            .push_history("blog", history_entry(Status::Degraded, 1500.0))
            .await
            .unwrap();
        store.push_violation(violation("agent", "max_cost_per_day")).await.unwrap();
        store.flush().await.unwrap();

        let reloaded = MemoryStore::with_snapshot(&path).unwrap();
        let record = reloaded.get_status(Scope::Worker, "blog").await.unwrap().unwrap();
        assert_eq!(record.status, Status::Degraded);
        assert_eq!(reloaded.history("blog", 10).await.unwrap().len(), 1);
        assert_eq!(reloaded.violations("agent", 10).await.unwrap().len(), 1);
    }
}
