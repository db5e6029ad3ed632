//! Periodic background refresh
//!
//! Every tick checks all devices one after another with a short pause in
//! between, and writes back only the devices whose status changed. A tick
//! that finds the run guard taken (manual scan or a slow previous cycle) is
//! skipped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use device_registry::{DevicePatch, DeviceRegistry};
use health_check::HealthChecker;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::scanner::ScanGuard;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_CHECK_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed { checked: usize, changed: usize },
    /// The run guard was held by another cycle
    Skipped,
}

/// Run one refresh cycle.
pub async fn refresh_cycle(
    registry: &DeviceRegistry,
    checker: &dyn HealthChecker,
    guard: &ScanGuard,
    check_delay: Duration,
) -> CycleOutcome {
    let Some(_permit) = guard.try_acquire() else {
        tracing::warn!("Skipping auto-refresh cycle, a scan is already running");
        return CycleOutcome::Skipped;
    };

    let devices = registry.list();
    let mut changed = 0;

    for (index, device) in devices.iter().enumerate() {
        if index > 0 && !check_delay.is_zero() {
            tokio::time::sleep(check_delay).await;
        }

        let report = checker.check(&device.ip_address).await;
        if report.status == device.status {
            continue;
        }

        if registry
            .update(&device.id, DevicePatch::new().status(report.status))
            .is_some()
        {
            tracing::info!(
                "Device {} at {} changed {} -> {}",
                device.name,
                device.ip_address,
                device.status,
                report.status
            );
            changed += 1;
        }
    }

    tracing::debug!("Auto-refresh checked {} device(s), {} changed", devices.len(), changed);
    CycleOutcome::Completed {
        checked: devices.len(),
        changed,
    }
}

/// Handle to the background refresh task
#[derive(Debug)]
pub struct AutoRefresh {
    interval: Duration,
    cycles: Arc<AtomicU64>,
    shutdown_tx: mpsc::Sender<()>,
    task_handle: JoinHandle<()>,
}

impl AutoRefresh {
    /// Spawn the refresh task. The first cycle runs one `interval` after start.
    pub fn start(
        registry: DeviceRegistry,
        checker: Arc<dyn HealthChecker>,
        guard: ScanGuard,
        interval: Duration,
        check_delay: Duration,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let cycles = Arc::new(AtomicU64::new(0));
        let task_cycles = Arc::clone(&cycles);

        let task_handle = tokio::spawn(async move {
            Self::refresh_loop(
                registry,
                checker,
                guard,
                interval,
                check_delay,
                task_cycles,
                shutdown_rx,
            )
            .await;
        });

        tracing::info!(
            "Auto-refresh started (every {:?}, {:?} between checks)",
            interval,
            check_delay
        );

        Self {
            interval,
            cycles,
            shutdown_tx,
            task_handle,
        }
    }

    async fn refresh_loop(
        registry: DeviceRegistry,
        checker: Arc<dyn HealthChecker>,
        guard: ScanGuard,
        period: Duration,
        check_delay: Duration,
        cycles: Arc<AtomicU64>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown_rx.recv() => break,
            }

            tokio::select! {
                outcome = refresh_cycle(&registry, checker.as_ref(), &guard, check_delay) => {
                    if let CycleOutcome::Completed { .. } = outcome {
                        cycles.fetch_add(1, Ordering::Relaxed);
                    }
                }
                _ = shutdown_rx.recv() => break,
            }
        }

        tracing::info!("Auto-refresh stopped");
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of cycles that ran to completion
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        !self.task_handle.is_finished()
    }

    /// Stop the task and wait for it to exit. An in-flight cycle is abandoned.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task_handle.await {
            tracing::error!("Auto-refresh task failed: {}", e);
        }
    }
}
