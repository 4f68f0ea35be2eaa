//! Errors surfaced to operators through the query and control surface

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("worker not found: {0}")]
    WorkerNotFound(String),

    #[error("emergency stop is disabled")]
    EmergencyStopDisabled,

    #[error(transparent)]
    Store(#[from] StoreError),
}
