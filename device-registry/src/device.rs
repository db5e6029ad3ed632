//! Device records and partial updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Track label shown while a device plays its live stream.
pub const LIVE_STREAM_TRACK: &str = "Live Stream";

/// Track label shown while a device runs in store mode.
pub const STORE_MODE_TRACK: &str = "Store Mode - Live Stream with Scheduled Content";

/// Stream URL assigned to newly added devices.
pub const DEFAULT_STREAM_URL: &str = "https://streamer.radio.co/s0066a9a04/listen";

/// Location assigned to newly added devices.
pub const DEFAULT_LOCATION: &str = "New Store";

/// Volume assigned to newly added devices.
pub const DEFAULT_VOLUME: u8 = 50;

/// Upper bound for device volume.
pub const MAX_VOLUME: u8 = 100;

/// Opaque device identifier, assigned when the device is added.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wrap an existing identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(format!("rpi-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Connectivity status as determined by the last health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    #[default]
    Offline,
}

impl DeviceStatus {
    pub fn is_online(self) -> bool {
        matches!(self, DeviceStatus::Online)
    }

    pub fn from_online(online: bool) -> Self {
        if online {
            DeviceStatus::Online
        } else {
            DeviceStatus::Offline
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceStatus::Online => f.write_str("online"),
            DeviceStatus::Offline => f.write_str("offline"),
        }
    }
}

/// A registered playback appliance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub status: DeviceStatus,
    pub is_playing: bool,
    /// Always within `0..=100`
    pub volume: u8,
    pub current_track: Option<String>,
    pub last_seen: DateTime<Utc>,
    pub location: String,
    pub ip_address: String,
    pub stream_url: String,
    pub is_scheduled_content: bool,
    pub store_mode: bool,
}

impl Device {
    /// Build a device with the defaults used by the "add device" action.
    ///
    /// A blank `name` falls back to `Raspberry Pi at <address>`.
    pub fn new(address: &str, name: Option<&str>, status: DeviceStatus) -> Self {
        let address = address.trim();
        let name = match name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => default_device_name(address),
        };

        Self {
            id: DeviceId::generate(),
            name,
            status,
            is_playing: false,
            volume: DEFAULT_VOLUME,
            current_track: None,
            last_seen: Utc::now(),
            location: DEFAULT_LOCATION.to_string(),
            ip_address: address.to_string(),
            stream_url: DEFAULT_STREAM_URL.to_string(),
            is_scheduled_content: false,
            store_mode: false,
        }
    }

    pub fn is_online(&self) -> bool {
        self.status.is_online()
    }

    /// Merge the present fields of `patch` into this device.
    ///
    /// Does not touch `last_seen`; the registry stamps it.
    pub(crate) fn apply(&mut self, patch: DevicePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(is_playing) = patch.is_playing {
            self.is_playing = is_playing;
        }
        if let Some(volume) = patch.volume {
            self.volume = clamp_volume(volume);
        }
        if let Some(current_track) = patch.current_track {
            self.current_track = current_track;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(ip_address) = patch.ip_address {
            self.ip_address = ip_address;
        }
        if let Some(stream_url) = patch.stream_url {
            self.stream_url = stream_url;
        }
        if let Some(is_scheduled_content) = patch.is_scheduled_content {
            self.is_scheduled_content = is_scheduled_content;
        }
        if let Some(store_mode) = patch.store_mode {
            self.store_mode = store_mode;
        }
    }
}

/// Default display name for a device added without one.
pub fn default_device_name(address: &str) -> String {
    format!("Raspberry Pi at {address}")
}

pub(crate) fn clamp_volume(volume: u8) -> u8 {
    volume.min(MAX_VOLUME)
}

/// Partial update for a [`Device`].
///
/// Absent fields are left unchanged. `current_track` is doubly optional:
/// `Some(None)` clears the label, `None` leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DevicePatch {
    pub name: Option<String>,
    pub status: Option<DeviceStatus>,
    pub is_playing: Option<bool>,
    #[serde(deserialize_with = "clamped_volume")]
    pub volume: Option<u8>,
    #[serde(with = "double_option", skip_serializing_if = "Option::is_none")]
    pub current_track: Option<Option<String>>,
    pub location: Option<String>,
    pub ip_address: Option<String>,
    pub stream_url: Option<String>,
    pub is_scheduled_content: Option<bool>,
    pub store_mode: Option<bool>,
}

impl DevicePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: DeviceStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn playing(mut self, is_playing: bool) -> Self {
        self.is_playing = Some(is_playing);
        self
    }

    pub fn volume(mut self, volume: u8) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn track(mut self, track: impl Into<String>) -> Self {
        self.current_track = Some(Some(track.into()));
        self
    }

    pub fn clear_track(mut self) -> Self {
        self.current_track = Some(None);
        self
    }

    pub fn scheduled_content(mut self, is_scheduled_content: bool) -> Self {
        self.is_scheduled_content = Some(is_scheduled_content);
        self
    }

    pub fn store_mode(mut self, store_mode: bool) -> Self {
        self.store_mode = Some(store_mode);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Accept any non-negative volume and clamp it to [`MAX_VOLUME`].
fn clamped_volume<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let volume = Option::<u64>::deserialize(deserializer)?;
    Ok(volume.map(|v| v.min(u64::from(MAX_VOLUME)) as u8))
}

/// Distinguishes a missing `currentTrack` key from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Option<Option<String>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer).map(Some)
    }
}
