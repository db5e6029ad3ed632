//! Device health checks
//!
//! A health check is one bounded-timeout reachability probe against a
//! device. It never fails: network errors, non-2xx answers and timeouts
//! all come back as an offline [`HealthReport`].
//!
//! Two checkers are provided:
//!
//! - [`HttpHealthChecker`] probes `GET http://<address>:5000/health` directly.
//! - [`RelayHealthChecker`] asks a relay server to probe on its behalf, for
//!   clients that cannot reach the device network themselves.
//!
//! # Example
//!
//! ```no_run
//! use health_check::{HealthCheckConfig, HealthChecker, HttpHealthChecker};
//!
//! # async fn run() -> Result<(), health_check::HealthError> {
//! let checker = HttpHealthChecker::new(HealthCheckConfig::default())?;
//! let report = checker.check("192.168.1.100").await;
//! println!("{} ({:?})", report.status, report.hostname);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

pub mod address;
mod config;
mod direct;
mod error;
mod relay;
mod report;

pub use address::health_url;
pub use config::{
    HealthCheckConfig, DEFAULT_PROBE_PATH, DEFAULT_PROBE_PORT, DEFAULT_PROBE_TIMEOUT, DEFAULT_USER_AGENT,
};
pub use direct::HttpHealthChecker;
pub use error::HealthError;
pub use relay::{HealthCheckRequest, RelayHealthChecker, RELAY_PATH};
pub use report::{HealthReport, UNKNOWN_HOSTNAME};

/// Something that can decide whether a device is reachable.
///
/// Implementations must not retry and must not return errors; every failure
/// becomes an offline report.
#[async_trait]
pub trait HealthChecker: Send + Sync {
    async fn check(&self, address: &str) -> HealthReport;
}

#[async_trait]
impl<T: HealthChecker + ?Sized> HealthChecker for Arc<T> {
    async fn check(&self, address: &str) -> HealthReport {
        (**self).check(address).await
    }
}

#[async_trait]
impl<T: HealthChecker + ?Sized> HealthChecker for Box<T> {
    async fn check(&self, address: &str) -> HealthReport {
        (**self).check(address).await
    }
}
