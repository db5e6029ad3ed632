//! Error types for orchestration operations.

use device_registry::{DeviceId, RegistryError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// Another scan or refresh cycle holds the run guard
    #[error("A scan is already in progress")]
    ScanInProgress,

    #[error("Device not found: {0}")]
    DeviceNotFound(DeviceId),

    /// "Add device" was submitted without a hostname or address
    #[error("Please enter a hostname or IP address")]
    MissingAddress,

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Convenience type alias for orchestration results.
pub type Result<T> = std::result::Result<T, ScanError>;
