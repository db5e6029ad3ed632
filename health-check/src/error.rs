//! Failure modes of a single probe.
//!
//! Probes never return these to callers: each one collapses into an
//! offline [`HealthReport`](crate::HealthReport) whose `error` field carries
//! the display text.

/// Why a probe did not come back online.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HealthError {
    /// The request did not finish within the configured timeout
    #[error("Timeout")]
    Timeout,

    /// The device answered with a non-2xx status
    #[error("HTTP {0}")]
    HttpStatus(u16),

    /// Connection refused, DNS failure, reset and similar
    #[error("{0}")]
    Network(String),

    /// The address could not be turned into a probe URL
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The HTTP client could not be built
    #[error("Client error: {0}")]
    Client(String),
}

impl From<reqwest::Error> for HealthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HealthError::Timeout
        } else if let Some(status) = err.status() {
            HealthError::HttpStatus(status.as_u16())
        } else if err.is_builder() {
            HealthError::Client(err.to_string())
        } else {
            HealthError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_error_display() {
        assert_eq!(HealthError::Timeout.to_string(), "Timeout");
        assert_eq!(HealthError::HttpStatus(503).to_string(), "HTTP 503");
        assert_eq!(
            HealthError::Network("Connection refused".to_string()).to_string(),
            "Connection refused"
        );
        assert_eq!(
            HealthError::InvalidAddress("".to_string()).to_string(),
            "Invalid address: "
        );
    }
}
