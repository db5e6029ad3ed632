//! User-level device actions.
//!
//! [`DeviceManager`] pairs registry mutations with health checks and
//! notifications. It is cheap to clone; clones share the registry, the
//! checker and the run guard.

use std::sync::Arc;
use std::time::Duration;

use device_registry::{
    Device, DeviceId, DevicePatch, DeviceRegistry, DeviceStatus, Playlist, ScheduleRequest, ScheduledContent,
    UploadedContent,
};
use health_check::{HealthChecker, HealthReport};

use crate::auto_refresh::AutoRefresh;
use crate::error::{Result, ScanError};
use crate::notification::{Notification, Notifier};
use crate::scanner::{check_all, check_device, DeviceCheck, ScanGuard, ScanSummary};

#[derive(Clone)]
pub struct DeviceManager {
    registry: DeviceRegistry,
    checker: Arc<dyn HealthChecker>,
    notifier: Notifier,
    guard: ScanGuard,
}

impl DeviceManager {
    pub fn new(registry: DeviceRegistry, checker: Arc<dyn HealthChecker>, notifier: Notifier) -> Self {
        Self {
            registry,
            checker,
            notifier,
            guard: ScanGuard::new(),
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn checker(&self) -> Arc<dyn HealthChecker> {
        Arc::clone(&self.checker)
    }

    pub fn scan_guard(&self) -> &ScanGuard {
        &self.guard
    }

    pub fn is_scanning(&self) -> bool {
        self.guard.is_running()
    }

    /// Start the periodic background refresh, sharing this manager's run guard.
    pub fn start_auto_refresh(&self, interval: Duration, check_delay: Duration) -> AutoRefresh {
        AutoRefresh::start(
            self.registry.clone(),
            Arc::clone(&self.checker),
            self.guard.clone(),
            interval,
            check_delay,
        )
    }

    // ------------------------------------------------------------------
    // Scanning
    // ------------------------------------------------------------------

    /// Check every registered device concurrently and apply the results.
    pub async fn scan_all(&self) -> Result<ScanSummary> {
        let _permit = self.guard.try_acquire().ok_or(ScanError::ScanInProgress)?;

        let devices = self.registry.list();
        if devices.is_empty() {
            self.notifier.notify(Notification::info(
                "No devices to scan",
                "Add some devices first using the 'Add Device' button",
            ));
            return Ok(ScanSummary::default());
        }

        self.notifier.notify(Notification::info(
            "Scanning devices...",
            format!("Testing connectivity for {} device(s)", devices.len()),
        ));

        let summary = ScanSummary::from_results(check_all(self.checker.as_ref(), &devices).await);
        let applied = self.registry.apply_statuses(&summary.statuses());
        tracing::debug!("Scan applied {} of {} statuses", applied, summary.total());

        self.notifier.notify(Notification::info(
            "Scan complete",
            format!(
                "Found {} online and {} offline device(s)",
                summary.online, summary.offline
            ),
        ));
        Ok(summary)
    }

    /// Check a single device and store its new status.
    pub async fn ping_one(&self, id: &DeviceId) -> Result<DeviceCheck> {
        let device = self
            .registry
            .get(id)
            .ok_or_else(|| ScanError::DeviceNotFound(id.clone()))?;

        let check = check_device(self.checker.as_ref(), &device).await;

        // The device may have been deleted while the probe was in flight
        self.registry
            .update(id, DevicePatch::new().status(check.status()))
            .ok_or_else(|| ScanError::DeviceNotFound(id.clone()))?;

        let notification = match check.status() {
            DeviceStatus::Online => {
                Notification::info("Device online", format!("{} is reachable", device.name))
            }
            DeviceStatus::Offline => Notification::warning(
                "Device offline",
                format!(
                    "{} did not respond: {}",
                    device.name,
                    check.report.error.as_deref().unwrap_or("unknown error")
                ),
            ),
        };
        self.notifier.notify(notification);
        Ok(check)
    }

    // ------------------------------------------------------------------
    // Registry actions
    // ------------------------------------------------------------------

    /// Test connectivity to `address` and register it whatever the outcome.
    pub async fn add_device(&self, address: &str, name: Option<&str>) -> Result<Device> {
        let address = address.trim();
        if address.is_empty() {
            return Err(ScanError::MissingAddress);
        }

        let report: HealthReport = self.checker.check(address).await;
        let device = Device::new(address, name, report.status);
        self.registry.add(device.clone())?;

        let notification = if report.is_online() {
            Notification::info(
                "Device added successfully",
                format!("{} is online and ready to use", device.name),
            )
        } else {
            Notification::warning(
                "Device added with limited connectivity",
                format!("{} was added but may be offline or unreachable", device.name),
            )
        };
        self.notifier.notify(notification);
        Ok(device)
    }

    pub fn delete_device(&self, id: &DeviceId) -> Result<Device> {
        let device = self
            .registry
            .get(id)
            .ok_or_else(|| ScanError::DeviceNotFound(id.clone()))?;
        if !self.registry.delete(id) {
            return Err(ScanError::DeviceNotFound(id.clone()));
        }

        self.notifier.notify(Notification::info(
            "Device removed",
            format!("{} has been removed", device.name),
        ));
        Ok(device)
    }

    pub fn select_device(&self, id: &DeviceId) -> Result<Device> {
        let device = self
            .registry
            .select(id)
            .ok_or_else(|| ScanError::DeviceNotFound(id.clone()))?;

        let description = if device.is_online() {
            format!("{} is now playing the live stream", device.name)
        } else {
            format!("{} is offline", device.name)
        };
        self.notifier.notify(Notification::info("Device selected", description));
        Ok(device)
    }

    /// Replace editable fields of a device
    pub fn update_device(&self, id: &DeviceId, patch: DevicePatch) -> Result<Device> {
        self.registry
            .update(id, patch)
            .ok_or_else(|| ScanError::DeviceNotFound(id.clone()))
    }

    // ------------------------------------------------------------------
    // Playback
    // ------------------------------------------------------------------

    pub fn toggle_playback(&self, id: &DeviceId) -> Result<Device> {
        let device = self.registry.toggle_playback(id)?;
        let title = if device.is_playing {
            "Playback started"
        } else {
            "Playback paused"
        };
        self.notifier.notify(Notification::info(title, device.name.clone()));
        Ok(device)
    }

    pub fn set_volume(&self, id: &DeviceId, volume: u8) -> Result<Device> {
        let device = self.registry.set_volume(id, volume)?;
        tracing::debug!("Volume for {} set to {}", device.name, device.volume);
        Ok(device)
    }

    pub fn set_store_mode(&self, id: &DeviceId, enabled: bool) -> Result<Device> {
        let device = self.registry.set_store_mode(id, enabled)?;
        let notification = if enabled {
            Notification::info(
                "Store Mode activated",
                format!("{} now mixes the live stream with scheduled content", device.name),
            )
        } else {
            Notification::info(
                "Live Stream mode activated",
                format!("{} now plays the live stream only", device.name),
            )
        };
        self.notifier.notify(notification);
        Ok(device)
    }

    pub fn play_playlist(&self, id: &DeviceId, playlist_id: &str) -> Result<Device> {
        let device = self.registry.play_playlist(id, playlist_id)?;
        self.notifier.notify(Notification::info(
            "Playlist changed",
            format!(
                "{} is now playing {}",
                device.name,
                device.current_track.as_deref().unwrap_or(playlist_id)
            ),
        ));
        Ok(device)
    }

    pub fn return_to_stream(&self, id: &DeviceId) -> Result<Device> {
        let device = self.registry.return_to_stream(id)?;
        self.notifier.notify(Notification::info(
            "Returned to live stream",
            format!("{} resumed the live stream", device.name),
        ));
        Ok(device)
    }

    pub fn playlists(&self) -> &'static [Playlist] {
        device_registry::playlists()
    }

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    pub fn upload_content(&self, id: &DeviceId, file_name: &str) -> Result<UploadedContent> {
        let content = self.registry.upload_content(id, file_name)?;
        self.notifier.notify(Notification::info(
            "Content uploaded",
            format!("{} is now available for scheduling", content.name),
        ));
        Ok(content)
    }

    pub fn schedule_content(&self, id: &DeviceId, request: ScheduleRequest) -> Result<ScheduledContent> {
        let entry = self.registry.schedule_content(id, request)?;
        self.notifier.notify(Notification::info(
            "Content scheduled",
            format!("{} scheduled for {} at {}", entry.content_name, entry.date, entry.start_time),
        ));
        Ok(entry)
    }

    pub fn remove_schedule(&self, id: &DeviceId, schedule_id: &str) -> Result<bool> {
        let removed = self.registry.remove_schedule(id, schedule_id)?;
        if removed {
            self.notifier
                .notify(Notification::info("Schedule removed", "The scheduled content was removed"));
        }
        Ok(removed)
    }
}

impl std::fmt::Debug for DeviceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceManager")
            .field("devices", &self.registry.len())
            .field("scanning", &self.guard.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use device_registry::{RegistryError, LIVE_STREAM_TRACK};
    use tokio::sync::mpsc::UnboundedReceiver;

    /// Reports addresses starting with "10." as online
    struct PrefixChecker;

    #[async_trait]
    impl HealthChecker for PrefixChecker {
        async fn check(&self, address: &str) -> HealthReport {
            if address.starts_with("10.") {
                HealthReport::online(Some(format!("host-{address}")))
            } else {
                HealthReport::offline("Timeout")
            }
        }
    }

    fn manager() -> (DeviceManager, UnboundedReceiver<Notification>) {
        let (notifier, rx) = Notifier::channel();
        (
            DeviceManager::new(DeviceRegistry::new(), Arc::new(PrefixChecker), notifier),
            rx,
        )
    }

    fn titles(rx: &mut UnboundedReceiver<Notification>) -> Vec<String> {
        let mut titles = Vec::new();
        while let Ok(n) = rx.try_recv() {
            titles.push(n.title);
        }
        titles
    }

    #[tokio::test]
    async fn test_add_device_online_and_offline() {
        let (manager, mut rx) = manager();

        let online = manager.add_device(" 10.0.0.5 ", None).await.unwrap();
        assert_eq!(online.status, DeviceStatus::Online);
        assert_eq!(online.ip_address, "10.0.0.5");
        assert_eq!(online.name, "Raspberry Pi at 10.0.0.5");

        let offline = manager.add_device("192.168.1.9", Some("Back Office")).await.unwrap();
        assert_eq!(offline.status, DeviceStatus::Offline);
        assert_eq!(offline.name, "Back Office");

        assert_eq!(manager.registry().len(), 2);
        assert_eq!(
            titles(&mut rx),
            vec!["Device added successfully", "Device added with limited connectivity"]
        );
    }

    #[tokio::test]
    async fn test_add_device_requires_address() {
        let (manager, mut rx) = manager();
        assert_eq!(manager.add_device("   ", None).await, Err(ScanError::MissingAddress));
        assert!(manager.registry().is_empty());
        assert!(titles(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_scan_all_empty() {
        let (manager, mut rx) = manager();
        let summary = manager.scan_all().await.unwrap();
        assert_eq!(summary, ScanSummary::default());
        assert_eq!(titles(&mut rx), vec!["No devices to scan"]);
        assert!(!manager.is_scanning());
    }

    #[tokio::test]
    async fn test_scan_all_applies_statuses() {
        let (manager, mut rx) = manager();
        let registry = manager.registry();
        let a = Device::new("10.0.0.1", None, DeviceStatus::Offline);
        let b = Device::new("172.16.0.1", None, DeviceStatus::Online);
        registry.add(a.clone()).unwrap();
        registry.add(b.clone()).unwrap();

        let summary = manager.scan_all().await.unwrap();

        assert_eq!(summary.online, 1);
        assert_eq!(summary.offline, 1);
        assert_eq!(summary.online + summary.offline, registry.len());
        assert!(registry.get(&a.id).unwrap().is_online());
        assert!(!registry.get(&b.id).unwrap().is_online());
        assert_eq!(titles(&mut rx), vec!["Scanning devices...", "Scan complete"]);
    }

    #[tokio::test]
    async fn test_scan_rejected_while_guard_held() {
        let (manager, _rx) = manager();
        manager
            .registry()
            .add(Device::new("10.0.0.1", None, DeviceStatus::Offline))
            .unwrap();

        let _permit = manager.scan_guard().try_acquire().unwrap();
        assert_eq!(manager.scan_all().await, Err(ScanError::ScanInProgress));
    }

    #[tokio::test]
    async fn test_ping_one() {
        let (manager, mut rx) = manager();
        let device = Device::new("192.168.0.2", None, DeviceStatus::Online);
        manager.registry().add(device.clone()).unwrap();

        let check = manager.ping_one(&device.id).await.unwrap();
        assert_eq!(check.status(), DeviceStatus::Offline);
        assert_eq!(check.report.error.as_deref(), Some("Timeout"));
        assert!(!manager.registry().get(&device.id).unwrap().is_online());
        assert_eq!(titles(&mut rx), vec!["Device offline"]);

        let missing = DeviceId::new("rpi-missing");
        assert_eq!(
            manager.ping_one(&missing).await,
            Err(ScanError::DeviceNotFound(missing))
        );
    }

    #[tokio::test]
    async fn test_select_and_delete() {
        let (manager, mut rx) = manager();
        let device = manager.add_device("10.1.1.1", None).await.unwrap();
        titles(&mut rx);

        let selected = manager.select_device(&device.id).unwrap();
        assert!(selected.is_playing);
        assert_eq!(selected.current_track.as_deref(), Some(LIVE_STREAM_TRACK));

        let removed = manager.delete_device(&device.id).unwrap();
        assert_eq!(removed.id, device.id);
        assert!(manager.registry().selected_id().is_none());
        assert_eq!(titles(&mut rx), vec!["Device selected", "Device removed"]);

        assert!(matches!(
            manager.delete_device(&device.id),
            Err(ScanError::DeviceNotFound(_))
        ));
        assert!(matches!(
            manager.select_device(&device.id),
            Err(ScanError::DeviceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_playback_actions_require_online() {
        let (manager, _rx) = manager();
        let offline = manager.add_device("192.168.5.5", None).await.unwrap();

        assert_eq!(
            manager.toggle_playback(&offline.id),
            Err(ScanError::Registry(RegistryError::DeviceOffline(offline.id.clone())))
        );

        let online = manager.add_device("10.5.5.5", None).await.unwrap();
        assert!(manager.toggle_playback(&online.id).unwrap().is_playing);
        assert_eq!(manager.set_volume(&online.id, 250).unwrap().volume, 100);
        assert!(manager.set_store_mode(&online.id, true).unwrap().store_mode);
    }
}
