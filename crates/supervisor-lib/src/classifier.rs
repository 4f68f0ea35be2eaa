//! Probe outcome classification
//!
//! Maps a single probe attempt to `healthy`, `degraded` or `down`.
//! There are no retries here: one attempt per cycle per target.

use crate::models::{ProbeOutcome, Status};

/// Responses at or above this latency are no longer `healthy`
pub const HEALTHY_LATENCY_MS: f64 = 1000.0;

/// Responses at or above this latency are `down` even with a 200
pub const DEGRADED_LATENCY_MS: f64 = 3000.0;

/// Classify a probe outcome, checking the rules in order
pub fn classify(outcome: &ProbeOutcome) -> Status {
    if !outcome.succeeded {
        return Status::Down;
    }

    let latency = match outcome.response_time_ms {
        Some(ms) if ms.is_finite() => ms,
        _ => return Status::Down,
    };

    match outcome.status_code {
        Some(200) if latency < HEALTHY_LATENCY_MS => Status::Healthy,
        Some(200) if latency < DEGRADED_LATENCY_MS => Status::Degraded,
        _ => Status::Down,
    }
}
