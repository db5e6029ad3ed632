//! Relay server errors.

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Every port in the configured range is taken
    #[error("No available port found in range {start}-{end}")]
    NoAvailablePort { start: u16, end: u16 },

    /// The HTTP server could not bind or start
    #[error("Relay server failed to start: {0}")]
    StartupFailed(String),
}
