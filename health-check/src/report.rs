//! Probe outcome, also the relay's response body.

use device_registry::DeviceStatus;
use serde::{Deserialize, Serialize};

use crate::error::HealthError;

/// Hostname reported when the device answers without one.
pub const UNKNOWN_HOSTNAME: &str = "Unknown";

/// Result of one health check.
///
/// Serializes as `{"status": "online"|"offline", "hostname"?: .., "error"?: ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: DeviceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    pub fn online(hostname: Option<String>) -> Self {
        Self {
            status: DeviceStatus::Online,
            hostname: Some(hostname.unwrap_or_else(|| UNKNOWN_HOSTNAME.to_string())),
            error: None,
        }
    }

    pub fn offline(error: impl Into<String>) -> Self {
        Self {
            status: DeviceStatus::Offline,
            hostname: None,
            error: Some(error.into()),
        }
    }

    pub fn is_online(&self) -> bool {
        self.status.is_online()
    }
}

impl From<HealthError> for HealthReport {
    fn from(err: HealthError) -> Self {
        HealthReport::offline(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_online_report_defaults_hostname() {
        let report = HealthReport::online(None);
        assert!(report.is_online());
        assert_eq!(report.hostname.as_deref(), Some(UNKNOWN_HOSTNAME));
    }

    #[test]
    fn test_report_wire_shape() {
        let json = serde_json::to_value(HealthReport::online(Some("pi-01".to_string()))).unwrap();
        assert_eq!(json, serde_json::json!({"status": "online", "hostname": "pi-01"}));

        let json = serde_json::to_value(HealthReport::from(HealthError::Timeout)).unwrap();
        assert_eq!(json, serde_json::json!({"status": "offline", "error": "Timeout"}));
    }
}
