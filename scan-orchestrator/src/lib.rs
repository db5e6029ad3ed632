//! Scan orchestration
//!
//! Drives health checks against the device registry:
//!
//! - **Manual scan**: every device checked concurrently, statuses applied in
//!   one bulk update.
//! - **Ping**: one device checked, status applied through a regular update.
//! - **Auto-refresh**: a background task checking devices one at a time on a
//!   fixed interval, writing back only changes.
//!
//! Manual scans and auto-refresh share a run guard ([`ScanGuard`]) so they
//! never overlap. Each user action emits a [`Notification`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use device_registry::DeviceRegistry;
//! use health_check::{HealthCheckConfig, HttpHealthChecker};
//! use scan_orchestrator::{DeviceManager, Notifier};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let checker = HttpHealthChecker::new(HealthCheckConfig::default())?;
//! let (notifier, mut notifications) = Notifier::channel();
//! let manager = DeviceManager::new(DeviceRegistry::new(), Arc::new(checker), notifier);
//!
//! manager.add_device("192.168.1.100", Some("Front Counter")).await?;
//! let summary = manager.scan_all().await?;
//! println!("{} online, {} offline", summary.online, summary.offline);
//!
//! let refresh = manager.start_auto_refresh(Duration::from_secs(60), Duration::from_secs(1));
//! while let Some(n) = notifications.recv().await {
//!     println!("{}: {}", n.title, n.description);
//! }
//! refresh.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod auto_refresh;
mod error;
mod manager;
pub mod notification;
pub mod scanner;

pub use auto_refresh::{
    refresh_cycle, AutoRefresh, CycleOutcome, DEFAULT_CHECK_DELAY, DEFAULT_REFRESH_INTERVAL,
};
pub use error::{Result, ScanError};
pub use manager::DeviceManager;
pub use notification::{Notification, Notifier, Severity};
pub use scanner::{check_all, check_device, DeviceCheck, ScanGuard, ScanPermit, ScanSummary};
