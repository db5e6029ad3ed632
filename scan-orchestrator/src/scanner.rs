//! Concurrent fan-out checks and the run guard that serializes scan cycles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use device_registry::{Device, DeviceId, DeviceStatus};
use futures::future::join_all;
use health_check::{HealthChecker, HealthReport};
use serde::Serialize;

/// Flag shared by manual scans and auto-refresh so that at most one
/// multi-device cycle runs at a time.
#[derive(Debug, Clone, Default)]
pub struct ScanGuard {
    running: Arc<AtomicBool>,
}

impl ScanGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard. `None` if a cycle is already running.
    pub fn try_acquire(&self) -> Option<ScanPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ScanPermit {
                running: Arc::clone(&self.running),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Held for the duration of a cycle; releases the guard on drop.
#[derive(Debug)]
pub struct ScanPermit {
    running: Arc<AtomicBool>,
}

impl Drop for ScanPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Outcome of checking one device
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCheck {
    pub device_id: DeviceId,
    pub name: String,
    pub ip_address: String,
    #[serde(flatten)]
    pub report: HealthReport,
}

impl DeviceCheck {
    pub fn status(&self) -> DeviceStatus {
        self.report.status
    }
}

/// Result of a full scan. `online + offline` equals the number of devices checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanSummary {
    pub online: usize,
    pub offline: usize,
    pub results: Vec<DeviceCheck>,
}

impl ScanSummary {
    pub fn from_results(results: Vec<DeviceCheck>) -> Self {
        let online = results.iter().filter(|r| r.status().is_online()).count();
        Self {
            online,
            offline: results.len() - online,
            results,
        }
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// `(id, status)` pairs in the shape the registry's bulk update takes
    pub fn statuses(&self) -> Vec<(DeviceId, DeviceStatus)> {
        self.results
            .iter()
            .map(|r| (r.device_id.clone(), r.status()))
            .collect()
    }
}

/// Check one device
pub async fn check_device<C>(checker: &C, device: &Device) -> DeviceCheck
where
    C: HealthChecker + ?Sized,
{
    let report = checker.check(&device.ip_address).await;
    if !report.is_online() {
        tracing::warn!(
            "Device {} at {} is offline: {}",
            device.name,
            device.ip_address,
            report.error.as_deref().unwrap_or("unknown error")
        );
    }

    DeviceCheck {
        device_id: device.id.clone(),
        name: device.name.clone(),
        ip_address: device.ip_address.clone(),
        report,
    }
}

/// Check every device concurrently. Results keep the order of `devices`.
pub async fn check_all<C>(checker: &C, devices: &[Device]) -> Vec<DeviceCheck>
where
    C: HealthChecker + ?Sized,
{
    join_all(devices.iter().map(|device| check_device(checker, device))).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_is_exclusive() {
        let guard = ScanGuard::new();
        let permit = guard.try_acquire().expect("first acquire succeeds");
        assert!(guard.is_running());
        assert!(guard.try_acquire().is_none());

        // Clones share the flag
        assert!(guard.clone().try_acquire().is_none());

        drop(permit);
        assert!(!guard.is_running());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_summary_counts() {
        let check = |status| DeviceCheck {
            device_id: DeviceId::generate(),
            name: "pi".into(),
            ip_address: "10.0.0.1".into(),
            report: match status {
                DeviceStatus::Online => HealthReport::online(None),
                DeviceStatus::Offline => HealthReport::offline("Timeout"),
            },
        };

        let summary = ScanSummary::from_results(vec![
            check(DeviceStatus::Online),
            check(DeviceStatus::Offline),
            check(DeviceStatus::Online),
        ]);

        assert_eq!(summary.online, 2);
        assert_eq!(summary.offline, 1);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.statuses()[1].1, DeviceStatus::Offline);
    }

    #[test]
    fn test_empty_summary() {
        let summary = ScanSummary::default();
        assert_eq!(summary.online + summary.offline, 0);
        assert!(summary.statuses().is_empty());
    }
}
