//! Device Registry
//!
//! An explicit, in-memory state container for a small fleet of networked
//! playback appliances. It holds the device list, the current selection
//! and the per-device content libraries used by store mode.
//!
//! # Features
//!
//! - **Typed records**: [`Device`], [`DevicePatch`], [`UploadedContent`], [`ScheduledContent`]
//! - **Partial updates**: every update stamps `last_seen`
//! - **Selection side effects**: selecting an online device starts its live stream
//!
//! # Quick Start
//!
//! ```rust
//! use device_registry::{Device, DeviceRegistry, DeviceStatus};
//!
//! let registry = DeviceRegistry::new();
//! let device = Device::new("192.168.1.100", None, DeviceStatus::Offline);
//! assert_eq!(device.name, "Raspberry Pi at 192.168.1.100");
//!
//! let id = device.id.clone();
//! registry.add(device).unwrap();
//! assert!(registry.delete(&id));
//! ```
//!
//! # Architecture
//!
//! ```text
//! DeviceRegistry (Clone, shared)
//!     │
//!     └── state: RwLock<RegistryState>
//!             ├── devices: Vec<Device>            (display order)
//!             ├── selected: Option<DeviceId>
//!             └── libraries: HashMap<DeviceId, ContentLibrary>
//! ```

pub mod content;
pub mod device;
pub mod error;
pub mod format;
pub mod playlist;
pub mod store;

pub use content::{ContentLibrary, ContentType, Repeat, ScheduleRequest, ScheduledContent, UploadedContent};
pub use device::{
    default_device_name, Device, DeviceId, DevicePatch, DeviceStatus, DEFAULT_LOCATION,
    DEFAULT_STREAM_URL, DEFAULT_VOLUME, LIVE_STREAM_TRACK, MAX_VOLUME, STORE_MODE_TRACK,
};
pub use error::{RegistryError, Result};
pub use format::format_last_seen;
pub use playlist::{find_playlist, playlists, Playlist};
pub use store::DeviceRegistry;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::device::{Device, DeviceId, DevicePatch, DeviceStatus};
    pub use crate::error::RegistryError;
    pub use crate::store::DeviceRegistry;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_workflow() {
        let registry = DeviceRegistry::new();
        let online = Device::new("192.168.1.10", Some("Front Door"), DeviceStatus::Online);
        let offline = Device::new("192.168.1.11", None, DeviceStatus::Offline);
        let online_id = online.id.clone();
        let offline_id = offline.id.clone();
        registry.add(online).unwrap();
        registry.add(offline).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.online_count(), 1);

        registry.select(&online_id);
        assert_eq!(registry.selected().unwrap().id, online_id);

        let applied = registry.apply_statuses(&[
            (online_id.clone(), DeviceStatus::Offline),
            (offline_id.clone(), DeviceStatus::Online),
        ]);
        assert_eq!(applied, 2);
        assert_eq!(registry.get(&offline_id).unwrap().status, DeviceStatus::Online);
        assert_eq!(registry.counts(), (2, 1));
    }
}
