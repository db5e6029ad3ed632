//! Direct HTTP probe against the device's health endpoint.

use async_trait::async_trait;
use serde::Deserialize;

use crate::address::health_url;
use crate::config::HealthCheckConfig;
use crate::error::HealthError;
use crate::report::HealthReport;
use crate::HealthChecker;

/// Body returned by a healthy device agent
#[derive(Debug, Default, Deserialize)]
struct HealthPayload {
    #[serde(default)]
    hostname: Option<String>,
}

/// Probes `GET http://<address>:<port>/health` once, with a timeout.
#[derive(Debug, Clone)]
pub struct HttpHealthChecker {
    client: reqwest::Client,
    config: HealthCheckConfig,
}

impl HttpHealthChecker {
    pub fn new(config: HealthCheckConfig) -> Result<Self, HealthError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| HealthError::Client(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HealthCheckConfig {
        &self.config
    }

    /// One probe, with failures kept typed
    pub async fn probe(&self, address: &str) -> Result<Option<String>, HealthError> {
        let url = health_url(address, &self.config)?;
        tracing::debug!("Probing {}", url);

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HealthError::HttpStatus(status.as_u16()));
        }

        // A 2xx with an unreadable body still counts as online
        let payload = match response.json::<HealthPayload>().await {
            Ok(payload) => payload,
            Err(e) if e.is_timeout() => return Err(HealthError::Timeout),
            Err(_) => HealthPayload::default(),
        };
        Ok(payload.hostname.filter(|h| !h.trim().is_empty()))
    }
}

#[async_trait]
impl HealthChecker for HttpHealthChecker {
    async fn check(&self, address: &str) -> HealthReport {
        match self.probe(address).await {
            Ok(hostname) => {
                tracing::debug!("Health check successful for {}", address);
                HealthReport::online(hostname)
            }
            Err(e) => {
                tracing::debug!("Health check failed for {}: {}", address, e);
                HealthReport::from(e)
            }
        }
    }
}
