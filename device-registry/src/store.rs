//! The device registry state container
//!
//! `DeviceRegistry` owns the device list, the current selection and the
//! per-device content libraries. It is a cheap cloneable handle: every
//! clone shares the same state, so the HTTP layer, the scanner and the
//! auto-refresh task all see one list.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use crate::content::{ContentLibrary, ScheduleRequest, ScheduledContent, UploadedContent};
use crate::device::{
    clamp_volume, Device, DeviceId, DevicePatch, DeviceStatus, LIVE_STREAM_TRACK, STORE_MODE_TRACK,
};
use crate::error::{RegistryError, Result};
use crate::playlist::find_playlist;

#[derive(Debug, Default)]
struct RegistryState {
    /// Insertion order is display order
    devices: Vec<Device>,
    selected: Option<DeviceId>,
    libraries: HashMap<DeviceId, ContentLibrary>,
}

impl RegistryState {
    fn find_mut(&mut self, id: &DeviceId) -> Option<&mut Device> {
        self.devices.iter_mut().find(|d| &d.id == id)
    }

    fn find(&self, id: &DeviceId) -> Option<&Device> {
        self.devices.iter().find(|d| &d.id == id)
    }
}

/// Process-scoped store for registered devices
///
/// # Example
///
/// ```rust
/// use device_registry::{Device, DeviceRegistry, DeviceStatus, DevicePatch};
///
/// let registry = DeviceRegistry::new();
/// let device = Device::new("192.168.1.100", None, DeviceStatus::Online);
/// let id = device.id.clone();
/// registry.add(device).unwrap();
///
/// registry.update(&id, DevicePatch::new().volume(80));
/// assert_eq!(registry.get(&id).unwrap().volume, 80);
///
/// registry.select(&id);
/// assert!(registry.get(&id).unwrap().is_playing);
/// ```
#[derive(Clone)]
pub struct DeviceRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(RegistryState::default())),
        }
    }

    // ------------------------------------------------------------------
    // Core mutators
    // ------------------------------------------------------------------

    /// Append a device. Ids must be unique; volume is clamped to 100.
    pub fn add(&self, mut device: Device) -> Result<()> {
        let mut state = self.state.write();
        if state.find(&device.id).is_some() {
            return Err(RegistryError::DuplicateDevice(device.id));
        }
        device.volume = clamp_volume(device.volume);
        tracing::debug!(
            "Registering device {} ({}) at {}",
            device.id,
            device.name,
            device.ip_address
        );
        state.devices.push(device);
        Ok(())
    }

    /// Merge `patch` into a device and stamp `last_seen` to now.
    ///
    /// Returns the updated device, or `None` if the id is unknown.
    pub fn update(&self, id: &DeviceId, patch: DevicePatch) -> Option<Device> {
        let mut state = self.state.write();
        let device = state.find_mut(id)?;
        device.apply(patch);
        device.last_seen = Utc::now();
        Some(device.clone())
    }

    /// Remove a device, its content library and, if it was selected, the selection.
    pub fn delete(&self, id: &DeviceId) -> bool {
        let removed = {
            let mut state = self.state.write();
            let before = state.devices.len();
            state.devices.retain(|d| &d.id != id);
            let removed = state.devices.len() != before;
            if removed {
                state.libraries.remove(id);
                if state.selected.as_ref() == Some(id) {
                    state.selected = None;
                }
            }
            removed
        };

        if !removed {
            tracing::debug!("Delete ignored, device {} not found", id);
        }
        removed
    }

    /// Select a device. An online device starts playing its live stream.
    ///
    /// Unknown ids leave the selection unchanged and return `None`.
    pub fn select(&self, id: &DeviceId) -> Option<Device> {
        let online = {
            let mut state = self.state.write();
            let online = match state.find(id) {
                Some(device) => device.is_online(),
                None => {
                    tracing::debug!("Select ignored, device {} not found", id);
                    return None;
                }
            };
            state.selected = Some(id.clone());
            online
        };

        if online {
            self.update(id, DevicePatch::new().playing(true).track(LIVE_STREAM_TRACK))
        } else {
            self.get(id)
        }
    }

    /// Replace the status of many devices at once, as a scan does.
    ///
    /// Online results refresh `last_seen`; offline results keep it.
    /// Returns how many devices were found and updated.
    pub fn apply_statuses(&self, results: &[(DeviceId, DeviceStatus)]) -> usize {
        let mut state = self.state.write();
        let now = Utc::now();
        let mut applied = 0;
        for (id, status) in results {
            if let Some(device) = state.find_mut(id) {
                device.status = *status;
                if status.is_online() {
                    device.last_seen = now;
                }
                applied += 1;
            }
        }
        applied
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn get(&self, id: &DeviceId) -> Option<Device> {
        self.state.read().find(id).cloned()
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        self.state.read().find(id).is_some()
    }

    /// Snapshot of all devices in insertion order
    pub fn list(&self) -> Vec<Device> {
        self.state.read().devices.clone()
    }

    pub fn selected_id(&self) -> Option<DeviceId> {
        self.state.read().selected.clone()
    }

    pub fn selected(&self) -> Option<Device> {
        let state = self.state.read();
        state.selected.as_ref().and_then(|id| state.find(id)).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn online_count(&self) -> usize {
        self.state.read().devices.iter().filter(|d| d.is_online()).count()
    }

    /// `(total, online)` taken from one snapshot, so `online <= total` always holds
    pub fn counts(&self) -> (usize, usize) {
        let state = self.state.read();
        let online = state.devices.iter().filter(|d| d.is_online()).count();
        (state.devices.len(), online)
    }

    /// Devices whose name or location contains `query` (case-insensitive)
    /// or whose address contains it verbatim. A blank query matches all.
    pub fn search(&self, query: &str) -> Vec<Device> {
        let query = query.trim();
        if query.is_empty() {
            return self.list();
        }
        let needle = query.to_lowercase();

        self.state
            .read()
            .devices
            .iter()
            .filter(|d| {
                d.name.to_lowercase().contains(&needle)
                    || d.location.to_lowercase().contains(&needle)
                    || d.ip_address.contains(query)
            })
            .cloned()
            .collect()
    }

    // ------------------------------------------------------------------
    // Playback actions
    // ------------------------------------------------------------------

    /// Apply a patch to an online device, computed from its current state.
    fn update_online<F>(&self, id: &DeviceId, patch_for: F) -> Result<Device>
    where
        F: FnOnce(&Device) -> Result<DevicePatch>,
    {
        let mut state = self.state.write();
        let device = state
            .find_mut(id)
            .ok_or_else(|| RegistryError::DeviceNotFound(id.clone()))?;
        if !device.is_online() {
            return Err(RegistryError::DeviceOffline(id.clone()));
        }
        let patch = patch_for(device)?;
        device.apply(patch);
        device.last_seen = Utc::now();
        Ok(device.clone())
    }

    /// Flip play/pause
    pub fn toggle_playback(&self, id: &DeviceId) -> Result<Device> {
        self.update_online(id, |device| Ok(DevicePatch::new().playing(!device.is_playing)))
    }

    /// Set volume, clamped to 100
    pub fn set_volume(&self, id: &DeviceId, volume: u8) -> Result<Device> {
        let volume = clamp_volume(volume);
        self.update_online(id, |_| Ok(DevicePatch::new().volume(volume)))
    }

    /// Switch between store mode and live-stream-only mode
    pub fn set_store_mode(&self, id: &DeviceId, enabled: bool) -> Result<Device> {
        let track = if enabled { STORE_MODE_TRACK } else { LIVE_STREAM_TRACK };
        self.update_online(id, |_| {
            Ok(DevicePatch::new()
                .store_mode(enabled)
                .track(track)
                .scheduled_content(false))
        })
    }

    /// Start a catalog playlist
    pub fn play_playlist(&self, id: &DeviceId, playlist_id: &str) -> Result<Device> {
        let playlist = find_playlist(playlist_id)
            .ok_or_else(|| RegistryError::UnknownPlaylist(playlist_id.to_string()))?;
        self.update_online(id, |_| {
            Ok(DevicePatch::new()
                .track(playlist.name)
                .playing(true)
                .scheduled_content(false))
        })
    }

    /// Leave scheduled content and resume the live stream
    pub fn return_to_stream(&self, id: &DeviceId) -> Result<Device> {
        self.update_online(id, |_| {
            Ok(DevicePatch::new()
                .track(LIVE_STREAM_TRACK)
                .playing(true)
                .scheduled_content(false))
        })
    }

    // ------------------------------------------------------------------
    // Content library
    // ------------------------------------------------------------------

    fn with_online_library<T, F>(&self, id: &DeviceId, f: F) -> Result<T>
    where
        F: FnOnce(&mut ContentLibrary) -> Result<T>,
    {
        let mut state = self.state.write();
        let online = state
            .find(id)
            .map(Device::is_online)
            .ok_or_else(|| RegistryError::DeviceNotFound(id.clone()))?;
        if !online {
            return Err(RegistryError::DeviceOffline(id.clone()));
        }
        f(state.libraries.entry(id.clone()).or_default())
    }

    pub fn upload_content(&self, id: &DeviceId, file_name: &str) -> Result<UploadedContent> {
        let content = self.with_online_library(id, |library| library.upload(file_name))?;
        tracing::info!("Uploaded {} to device {}", content.name, id);
        Ok(content)
    }

    pub fn schedule_content(&self, id: &DeviceId, request: ScheduleRequest) -> Result<ScheduledContent> {
        let entry = self.with_online_library(id, |library| library.schedule(request))?;
        tracing::info!(
            "Scheduled {} on device {} for {} at {}",
            entry.content_name,
            id,
            entry.date,
            entry.start_time
        );
        Ok(entry)
    }

    pub fn content(&self, id: &DeviceId) -> Result<Vec<UploadedContent>> {
        let state = self.state.read();
        if state.find(id).is_none() {
            return Err(RegistryError::DeviceNotFound(id.clone()));
        }
        Ok(state
            .libraries
            .get(id)
            .map(|l| l.uploads().to_vec())
            .unwrap_or_default())
    }

    pub fn schedules(&self, id: &DeviceId) -> Result<Vec<ScheduledContent>> {
        let state = self.state.read();
        if state.find(id).is_none() {
            return Err(RegistryError::DeviceNotFound(id.clone()));
        }
        Ok(state
            .libraries
            .get(id)
            .map(|l| l.schedules().to_vec())
            .unwrap_or_default())
    }

    pub fn remove_schedule(&self, id: &DeviceId, schedule_id: &str) -> Result<bool> {
        let mut state = self.state.write();
        if state.find(id).is_none() {
            return Err(RegistryError::DeviceNotFound(id.clone()));
        }
        Ok(state
            .libraries
            .get_mut(id)
            .map(|l| l.remove_schedule(schedule_id))
            .unwrap_or(false))
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("device_count", &self.len())
            .field("selected", &self.selected_id())
            .finish()
    }
}
