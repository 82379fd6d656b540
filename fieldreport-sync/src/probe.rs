//! Bounded-time connectivity probe.
//!
//! The single gate consulted before every remote-touching operation.
//! The probe never errors and never hangs: any transport failure, DNS
//! failure or timeout is reported as "offline".

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Reachability check against a well-known endpoint.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Returns true if the device currently has connectivity.
    async fn probe(&self) -> bool;
}

/// Configuration for the HTTP connectivity probe.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Endpoint to probe with a HEAD request.
    pub endpoint: String,
    /// Hard timeout for the whole probe.
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.google.com".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// HEAD-request probe over HTTP.
pub struct HttpProbe {
    config: ProbeConfig,
    client: reqwest::Client,
}

impl HttpProbe {
    /// Creates a probe with the given configuration.
    pub fn new(config: ProbeConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("failed to create HTTP client");
        Self { config, client }
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new(ProbeConfig::default())
    }
}

#[async_trait]
impl ConnectivityProbe for HttpProbe {
    async fn probe(&self) -> bool {
        match self.client.head(&self.config.endpoint).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("connectivity probe failed: {e}");
                false
            }
        }
    }
}
