//! Error types for registry operations.

use crate::device::DeviceId;

/// Errors returned by registry mutations that can be refused.
///
/// Plain `update`/`delete`/`select` calls never fail: an unknown id is
/// ignored. The playback and content operations report why they did
/// nothing so callers can surface it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No device with this id is registered
    #[error("Device not found: {0}")]
    DeviceNotFound(DeviceId),

    /// A device with this id is already registered
    #[error("Device already registered: {0}")]
    DuplicateDevice(DeviceId),

    /// The device is offline and cannot accept playback or content changes
    #[error("Device is offline: {0}")]
    DeviceOffline(DeviceId),

    /// The playlist id is not in the catalog
    #[error("Unknown playlist: {0}")]
    UnknownPlaylist(String),

    /// Uploaded content with this id does not exist for the device
    #[error("Content not found: {0}")]
    ContentNotFound(String),

    /// A required field was empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

/// Convenience type alias for registry results.
pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_display() {
        let error = RegistryError::DeviceNotFound(DeviceId::new("rpi-1"));
        assert_eq!(error.to_string(), "Device not found: rpi-1");

        let error = RegistryError::MissingField("date");
        assert_eq!(error.to_string(), "Missing required field: date");

        let error = RegistryError::UnknownPlaylist("polka".to_string());
        assert!(error.to_string().contains("polka"));
    }
}
