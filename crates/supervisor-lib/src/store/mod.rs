//! Status store
//!
//! Keyed record store holding the current status of every target and
//! agent, plus capped per-name history and violation logs. Writes are
//! full-record replaces with last-write-wins semantics; there is no
//! locking across keys and no compare-and-swap.

mod bounded;
mod memory;

pub use bounded::BoundedLog;
pub use memory::{MemoryStore, StoreSnapshot};

use crate::models::{HistoryEntry, PolicyViolation, StatusRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Errors surfaced by a status store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Keyspace a status record lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Worker,
    Agent,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Worker => write!(f, "worker"),
            Scope::Agent => write!(f, "agent"),
        }
    }
}

/// Repository interface every component reads and writes through
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Check that the store is reachable
    async fn ping(&self) -> Result<(), StoreError>;

    /// Current record, `None` if the name was never written
    async fn get_status(&self, scope: Scope, name: &str)
        -> Result<Option<StatusRecord>, StoreError>;

    /// Replace the record for `name`
    async fn put_status(
        &self,
        scope: Scope,
        name: &str,
        record: StatusRecord,
    ) -> Result<(), StoreError>;

    /// Prepend a probe result to the worker's history
    async fn push_history(&self, name: &str, entry: HistoryEntry) -> Result<(), StoreError>;

    /// Up to `limit` history entries, newest first
    async fn history(&self, name: &str, limit: usize) -> Result<Vec<HistoryEntry>, StoreError>;

    /// Prepend a violation to the agent's log
    async fn push_violation(&self, violation: PolicyViolation) -> Result<(), StoreError>;

    /// Up to `limit` violations for `agent`, newest first
    async fn violations(
        &self,
        agent: &str,
        limit: usize,
    ) -> Result<Vec<PolicyViolation>, StoreError>;

    /// Persist pending writes, if the backend supports it
    async fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
