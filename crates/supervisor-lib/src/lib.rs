//! Fleet supervision library
//!
//! This crate provides the core functionality for:
//! - Liveness probing and classification of worker services
//! - Availability estimation and per-target status history
//! - Behavioral policy checks and escalation of autonomous agents
//! - Alerting, simulated remediation and operator emergency stops
//! - Health checks and observability

pub mod classifier;
pub mod error;
pub mod escalation;
pub mod health;
pub mod models;
pub mod notify;
pub mod observability;
pub mod policy;
pub mod probe;
pub mod registry;
pub mod remediation;
pub mod scheduler;
pub mod store;
pub mod supervisor;
pub mod uptime;
pub mod views;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use error::SupervisorError;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{StructuredLogger, SupervisorMetrics};
pub use registry::TargetRegistry;
pub use store::{MemoryStore, Scope, StatusStore, StoreError};
pub use supervisor::{Collaborators, Supervisor, SupervisorConfig, SupervisorHandle};
