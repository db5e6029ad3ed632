//! Health checks performed by a remote relay on the client's behalf.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::HealthCheckConfig;
use crate::error::HealthError;
use crate::report::HealthReport;
use crate::HealthChecker;

/// Path the relay serves.
pub const RELAY_PATH: &str = "check-device-health";

/// Extra time allowed on top of the relay's own probe timeout.
const RELAY_OVERHEAD: Duration = Duration::from_secs(2);

/// Request body for the relay
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckRequest {
    #[serde(default)]
    pub ip_address: Option<String>,
}

impl HealthCheckRequest {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            ip_address: Some(address.into()),
        }
    }

    /// The trimmed address, if one was given
    pub fn address(&self) -> Option<&str> {
        self.ip_address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }
}

/// Error body the relay returns for rejected requests
#[derive(Debug, Deserialize)]
struct RelayErrorBody {
    error: Option<String>,
}

/// Asks a relay at `<base>/check-device-health` to probe the device.
#[derive(Debug, Clone)]
pub struct RelayHealthChecker {
    client: reqwest::Client,
    endpoint: Url,
}

impl RelayHealthChecker {
    pub fn new(relay_base: &str, config: &HealthCheckConfig) -> Result<Self, HealthError> {
        let endpoint = relay_endpoint(relay_base)?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout + RELAY_OVERHEAD)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| HealthError::Client(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn request(&self, address: &str) -> Result<HealthReport, HealthError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&HealthCheckRequest::new(address))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<HealthReport>()
                .await
                .map_err(|e| HealthError::Network(format!("Invalid relay response: {e}")));
        }

        // Relay rejected the request; surface its message when there is one
        match response.json::<RelayErrorBody>().await {
            Ok(RelayErrorBody { error: Some(message) }) => Err(HealthError::Network(message)),
            _ => Err(HealthError::HttpStatus(status.as_u16())),
        }
    }
}

#[async_trait]
impl HealthChecker for RelayHealthChecker {
    async fn check(&self, address: &str) -> HealthReport {
        match self.request(address).await {
            Ok(report) => {
                tracing::debug!("Relay reported {} for {}", report.status, address);
                report
            }
            Err(e) => {
                tracing::debug!("Relay check failed for {}: {}", address, e);
                HealthReport::from(e)
            }
        }
    }
}

/// `<base>/check-device-health`, tolerating a trailing slash on the base
fn relay_endpoint(relay_base: &str) -> Result<Url, HealthError> {
    let base = relay_base.trim().trim_end_matches('/');
    Url::parse(&format!("{base}/{RELAY_PATH}"))
        .map_err(|_| HealthError::InvalidAddress(relay_base.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_endpoint() {
        let url = relay_endpoint("http://127.0.0.1:3400/").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:3400/check-device-health");

        let url = relay_endpoint("https://example.net/functions/v1").unwrap();
        assert_eq!(url.as_str(), "https://example.net/functions/v1/check-device-health");

        assert!(relay_endpoint("not a url").is_err());
    }

    #[test]
    fn test_request_address() {
        let request: HealthCheckRequest = serde_json::from_str(r#"{"ipAddress": " 10.0.0.1 "}"#).unwrap();
        assert_eq!(request.address(), Some("10.0.0.1"));

        let request: HealthCheckRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(request.address(), None);

        let request: HealthCheckRequest = serde_json::from_str(r#"{"ipAddress": ""}"#).unwrap();
        assert_eq!(request.address(), None);
    }
}
