//! Periodic supervision
//!
//! A [`Cycle`] is one pass over a set of targets. [`CycleLoop`] drives a
//! cycle forever on an interval, backing off after a failed pass, until
//! its owner signals shutdown.

mod agents;
mod r#loop;
mod workers;

pub use agents::AgentCycle;
pub use r#loop::{CycleLoop, CycleLoopBuilder, LoopConfig};
pub use workers::WorkerCycle;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Counters from one completed pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub targets: usize,
    /// Targets whose pipeline hit a store error or panicked
    pub failures: usize,
    pub down: usize,
    pub suspicious: usize,
    pub skipped: usize,
}

/// One supervision pass over a set of targets
#[async_trait]
pub trait Cycle: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Number of targets a pass will visit
    fn target_count(&self) -> usize;

    async fn run(&self) -> Result<CycleSummary>;
}
