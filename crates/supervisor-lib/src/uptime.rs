//! Availability estimation
//!
//! Exponential moving average over up/down observations. Each sample
//! carries a 5% weight, so a single flaky probe moves the estimate by at
//! most 5 points while sustained failures drive it toward zero.

use crate::models::{Status, INITIAL_UPTIME_PERCENT};

/// Weight kept from the previous estimate
pub const DECAY: f64 = 0.95;

/// Points contributed by an "up" sample
pub const UP_CONTRIBUTION: f64 = 5.0;

/// Smoothed uptime estimator
#[derive(Debug, Clone, Copy, Default)]
pub struct UptimeEstimator;

impl UptimeEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Fold one observation into the previous estimate.
    ///
    /// `previous` is `None` for a target that has never been checked.
    pub fn observe(&self, previous: Option<f64>, is_up: bool) -> f64 {
        let prev = previous
            .filter(|p| p.is_finite())
            .unwrap_or(INITIAL_UPTIME_PERCENT)
            .clamp(0.0, 100.0);
        let sample = if is_up { 1.0 } else { 0.0 };
        (prev * DECAY + sample * UP_CONTRIBUTION).clamp(0.0, 100.0)
    }

    /// Fold a classification into the previous estimate
    pub fn observe_status(&self, previous: Option<f64>, status: Status) -> f64 {
        self.observe(previous, status.is_up())
    }

    /// Decay applied when the target could not be reached at all
    pub fn observe_unreachable(&self, previous: Option<f64>) -> f64 {
        self.observe(previous, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_seeded_at_one_hundred() {
        let est = UptimeEstimator::new();
        assert!((est.observe(None, true) - 100.0).abs() < EPS);
        assert!((est.observe(None, false) - 95.0).abs() < EPS);
    }

    #[test]
    fn test_documented_sequence() {
        let est = UptimeEstimator::new();
        let after_healthy = est.observe_status(None, Status::Healthy);
        assert!((after_healthy - 100.0).abs() < EPS);

        let after_timeout = est.observe_unreachable(Some(after_healthy));
        assert!((after_timeout - 95.0).abs() < EPS);

        let after_recovery = est.observe_status(Some(after_timeout), Status::Healthy);
        assert!((after_recovery - 95.25).abs() < EPS);
    }

    #[test]
    fn test_degraded_counts_as_up() {
        let est = UptimeEstimator::new();
        assert!((est.observe_status(Some(50.0), Status::Degraded) - 52.5).abs() < EPS);
        assert!((est.observe_status(Some(50.0), Status::Down) - 47.5).abs() < EPS);
    }

    #[test]
    fn test_sustained_failure_is_monotonic_and_bounded() {
        let est = UptimeEstimator::new();
        let mut uptime = 100.0;
        for _ in 0..500 {
            let next = est.observe_status(Some(uptime), Status::Down);
            assert!(next <= uptime);
            assert!((0.0..=100.0).contains(&next));
            uptime = next;
        }
        assert!(uptime < 1e-6);
    }

    #[test]
    fn test_sustained_recovery_is_monotonic_and_bounded() {
        let est = UptimeEstimator::new();
        let mut uptime = 0.0;
        for _ in 0..500 {
            let next = est.observe_status(Some(uptime), Status::Healthy);
            assert!(next >= uptime);
            assert!((0.0..=100.0).contains(&next));
            uptime = next;
        }
        assert!(uptime > 99.99);
    }

    #[test]
    fn test_out_of_range_previous_is_clamped() {
        let est = UptimeEstimator::new();
        assert!(est.observe(Some(250.0), true) <= 100.0);
        assert!(est.observe(Some(-20.0), false) >= 0.0);
        assert!((est.observe(Some(f64::NAN), true) - 100.0).abs() < EPS);
    }
}
