//! Probe configuration.

use std::time::Duration;

/// Port the device agent listens on.
pub const DEFAULT_PROBE_PORT: u16 = 5000;

/// Path of the device agent's health endpoint.
pub const DEFAULT_PROBE_PATH: &str = "/health";

/// Per-probe timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_USER_AGENT: &str = concat!("fleet-dashboard/", env!("CARGO_PKG_VERSION"));

/// Settings shared by the direct and relay-backed checkers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheckConfig {
    /// Port used when the address does not carry one
    pub port: u16,
    pub path: String,
    /// Upper bound for one probe, connect through body
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PROBE_PORT,
            path: DEFAULT_PROBE_PATH.to_string(),
            timeout: DEFAULT_PROBE_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HealthCheckConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}
