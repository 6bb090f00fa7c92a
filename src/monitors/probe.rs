//! HealthProbe - one bounded HTTP health check per service
//!
//! A probe never fails past its boundary: connection errors, timeouts and
//! non-2xx answers are all reported as `down` with a response time of `0`.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, instrument, trace};

use crate::config::ServiceConfig;
use crate::{ServiceHealth, ServiceStatus};

/// Upper bound for a single health request
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct HealthProbe {
    /// HTTP client (reused across probes)
    client: reqwest::Client,
}

impl HealthProbe {
    pub fn new() -> Result<Self> {
        Self::with_timeout(PROBE_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for health probes")?;
        Ok(Self { client })
    }

    /// Check a single service endpoint.
    #[instrument(skip(self, service), fields(service = %service.name))]
    pub async fn probe(&self, service: &ServiceConfig) -> ServiceHealth {
        let url = service.url();
        trace!("checking service at {url}");

        let start = Instant::now();
        let result = self.client.get(&url).send().await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(response) if response.status().is_success() => {
                trace!("{url}: up in {elapsed_ms}ms");
                ServiceHealth::up(elapsed_ms)
            }
            Ok(response) => {
                debug!("{url}: unexpected status code {}", response.status());
                ServiceHealth::down()
            }
            Err(e) => {
                debug!("{url}: health check failed: {e}");
                ServiceHealth::down()
            }
        }
    }

    /// Probe every service in order, one at a time.
    pub async fn probe_all(&self, services: &[ServiceConfig]) -> BTreeMap<String, ServiceHealth> {
        let mut results = BTreeMap::new();
        for service in services {
            let health = self.probe(service).await;
            results.insert(service.name.clone(), health);
        }

        let down = results
            .values()
            .filter(|health| health.status == ServiceStatus::Down)
            .count();
        debug!("probed {} services, {down} down", results.len());

        results
    }
}
