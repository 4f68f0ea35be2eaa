//! Liveness and latency probes
//!
//! A probe is one HTTP GET against a target URL. Probes never return an
//! error: transport failures and timeouts become a failed `ProbeOutcome`
//! so the caller can classify them like any other result.

use crate::models::ProbeOutcome;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default per-attempt timeout
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for probe implementations
#[async_trait]
pub trait Prober: Send + Sync {
    /// Issue a single probe against `url`
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// Prober backed by a shared reqwest client
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    /// Create a prober whose attempts are bounded by `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create probe HTTP client")?;

        Ok(Self { client })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let start = Instant::now();

        match self.client.get(url).send().await {
            Ok(response) => {
                let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
                let status = response.status().as_u16();
                debug!(url = %url, status = status, elapsed_ms = elapsed_ms, "Probe completed");
                ProbeOutcome::responded(status, elapsed_ms)
            }
            Err(e) => {
                let reason = if e.is_timeout() {
                    format!("timed out: {}", e)
                } else {
                    e.to_string()
                };
                debug!(url = %url, error = %reason, "Probe failed");
                ProbeOutcome::failed(reason)
            }
        }
    }
}
