//! Command line and environment configuration

use std::net::IpAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;

/// How the daemon reaches devices for health checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CheckMode {
    /// Probe devices directly
    Direct,
    /// Ask a relay server to probe on our behalf
    Relay,
}

impl std::str::FromStr for CheckMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "direct" => Ok(CheckMode::Direct),
            "relay" => Ok(CheckMode::Relay),
            other => Err(anyhow::anyhow!("Unknown check mode '{}', expected direct or relay", other)),
        }
    }
}

/// Fleet Dashboard
///
/// Keeps a registry of store playback devices, checks their health and
/// serves a JSON API for the dashboard.
#[derive(Parser, Debug, Clone)]
#[command(name = "fleet-dashboard")]
#[command(about = "Device fleet dashboard daemon")]
#[command(version)]
pub struct Args {
    /// Address the dashboard API binds to
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Dashboard API port
    #[arg(short = 'p', long, default_value = "8080")]
    pub api_port: u16,

    /// Also run a health-check relay server
    #[arg(long)]
    pub enable_relay: bool,

    /// Relay server port range start
    #[arg(long, default_value = "54321")]
    pub relay_port_start: u16,

    /// Relay server port range end
    #[arg(long, default_value = "54421")]
    pub relay_port_end: u16,

    /// How health checks reach devices
    #[arg(long, value_enum, default_value = "direct")]
    pub check_mode: CheckMode,

    /// Base URL of a remote relay (relay mode without --enable-relay)
    #[arg(long)]
    pub relay_url: Option<String>,

    /// Port of the device health endpoint
    #[arg(long, default_value = "5000")]
    pub probe_port: u16,

    /// Health probe timeout in seconds
    #[arg(long, default_value = "5")]
    pub probe_timeout: u64,

    /// Auto-refresh interval in seconds
    #[arg(long, default_value = "60")]
    pub refresh_interval: u64,

    /// Pause between device checks during auto-refresh, in milliseconds
    #[arg(long, default_value = "1000")]
    pub check_delay_ms: u64,

    /// Disable the periodic background refresh
    #[arg(long)]
    pub no_auto_refresh: bool,

    /// Devices to register at startup (repeatable)
    #[arg(short = 'd', long = "device")]
    pub devices: Vec<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Override arguments from `FLEET_*` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(bind) = std::env::var("FLEET_BIND") {
            self.bind = bind.parse().context("Invalid FLEET_BIND environment variable")?;
        }

        if let Ok(port) = std::env::var("FLEET_API_PORT") {
            self.api_port = port.parse().context("Invalid FLEET_API_PORT environment variable")?;
        }

        if std::env::var("FLEET_ENABLE_RELAY").is_ok() {
            self.enable_relay = true;
        }

        if let Ok(start) = std::env::var("FLEET_RELAY_PORT_START") {
            self.relay_port_start = start
                .parse()
                .context("Invalid FLEET_RELAY_PORT_START environment variable")?;
        }

        if let Ok(end) = std::env::var("FLEET_RELAY_PORT_END") {
            self.relay_port_end = end
                .parse()
                .context("Invalid FLEET_RELAY_PORT_END environment variable")?;
        }

        if let Ok(mode) = std::env::var("FLEET_CHECK_MODE") {
            self.check_mode = mode.parse().context("Invalid FLEET_CHECK_MODE environment variable")?;
        }

        if let Ok(url) = std::env::var("FLEET_RELAY_URL") {
            self.relay_url = Some(url);
        }

        if let Ok(port) = std::env::var("FLEET_PROBE_PORT") {
            self.probe_port = port.parse().context("Invalid FLEET_PROBE_PORT environment variable")?;
        }

        if let Ok(timeout) = std::env::var("FLEET_PROBE_TIMEOUT") {
            self.probe_timeout = timeout
                .parse()
                .context("Invalid FLEET_PROBE_TIMEOUT environment variable")?;
        }

        if let Ok(interval) = std::env::var("FLEET_REFRESH_INTERVAL") {
            self.refresh_interval = interval
                .parse()
                .context("Invalid FLEET_REFRESH_INTERVAL environment variable")?;
        }

        if let Ok(delay) = std::env::var("FLEET_CHECK_DELAY_MS") {
            self.check_delay_ms = delay
                .parse()
                .context("Invalid FLEET_CHECK_DELAY_MS environment variable")?;
        }

        if std::env::var("FLEET_NO_AUTO_REFRESH").is_ok() {
            self.no_auto_refresh = true;
        }

        if let Ok(devices) = std::env::var("FLEET_DEVICES") {
            self.devices.extend(
                devices
                    .split(',')
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(String::from),
            );
        }

        if let Ok(log_level) = std::env::var("FLEET_LOG_LEVEL") {
            self.log_level = log_level;
        }

        Ok(())
    }

    /// Validate command line arguments
    pub fn validate(&self) -> Result<()> {
        if self.enable_relay {
            if self.relay_port_start == 0 || self.relay_port_end == 0 {
                return Err(anyhow::anyhow!("Relay port range must not include port 0"));
            }

            if self.relay_port_start > self.relay_port_end {
                return Err(anyhow::anyhow!(
                    "Invalid relay port range: start ({}) > end ({})",
                    self.relay_port_start,
                    self.relay_port_end
                ));
            }
        }

        if self.check_mode == CheckMode::Relay && self.relay_url.is_none() && !self.enable_relay {
            return Err(anyhow::anyhow!(
                "Relay check mode needs --relay-url or --enable-relay"
            ));
        }

        if self.probe_port == 0 {
            return Err(anyhow::anyhow!("Probe port must not be 0"));
        }

        if self.probe_timeout == 0 {
            return Err(anyhow::anyhow!("Probe timeout must be positive"));
        }

        if self.refresh_interval == 0 {
            return Err(anyhow::anyhow!("Refresh interval must be positive"));
        }

        match self.log_level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => {
                return Err(anyhow::anyhow!(
                    "Invalid log level '{}'. Valid levels: error, warn, info, debug, trace",
                    self.log_level
                ));
            }
        }

        Ok(())
    }
}

/// Configuration derived from command line arguments and environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: IpAddr,
    pub api_port: u16,
    pub enable_relay: bool,
    pub relay_port_range: (u16, u16),
    pub check_mode: CheckMode,
    pub relay_url: Option<String>,
    pub probe_port: u16,
    pub probe_timeout: Duration,
    pub refresh_interval: Duration,
    pub check_delay: Duration,
    pub auto_refresh: bool,
    pub devices: Vec<String>,
    pub log_level: String,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            bind: args.bind,
            api_port: args.api_port,
            enable_relay: args.enable_relay,
            relay_port_range: (args.relay_port_start, args.relay_port_end),
            check_mode: args.check_mode,
            relay_url: args.relay_url,
            probe_port: args.probe_port,
            probe_timeout: Duration::from_secs(args.probe_timeout),
            refresh_interval: Duration::from_secs(args.refresh_interval),
            check_delay: Duration::from_millis(args.check_delay_ms),
            auto_refresh: !args.no_auto_refresh,
            devices: args.devices,
            log_level: args.log_level,
        }
    }
}

impl Config {
    /// Create configuration from command line arguments and environment variables
    pub fn from_env() -> Result<Self> {
        let mut args = Args::parse();
        args.apply_env_overrides()?;
        args.validate()?;
        Ok(Config::from(args))
    }

    pub fn print_summary(&self) {
        info!("Configuration:");
        info!("  API address: {}:{}", self.bind, self.api_port);
        if self.enable_relay {
            info!(
                "  Relay server: ports {}-{}",
                self.relay_port_range.0, self.relay_port_range.1
            );
        } else {
            info!("  Relay server: disabled");
        }
        info!("  Check mode: {:?}", self.check_mode);
        if let Some(url) = &self.relay_url {
            info!("  Relay URL: {}", url);
        }
        info!("  Probe: port {}, timeout {}s", self.probe_port, self.probe_timeout.as_secs());
        if self.auto_refresh {
            info!(
                "  Auto-refresh: every {}s, {}ms between checks",
                self.refresh_interval.as_secs(),
                self.check_delay.as_millis()
            );
        } else {
            info!("  Auto-refresh: disabled");
        }
        info!("  Startup devices: {}", self.devices.len());
        info!("  Log level: {}", self.log_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("fleet-dashboard").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert!(args.validate().is_ok());

        let config = Config::from(args);
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.check_mode, CheckMode::Direct);
        assert_eq!(config.probe_port, 5000);
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
        assert_eq!(config.refresh_interval, Duration::from_secs(60));
        assert_eq!(config.check_delay, Duration::from_secs(1));
        assert!(config.auto_refresh);
        assert!(!config.enable_relay);
    }

    #[test]
    fn test_repeated_devices() {
        let config = Config::from(parse(&["-d", "10.0.0.1", "--device", "10.0.0.2"]));
        assert_eq!(config.devices, vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[rstest]
    #[case(&["--probe-timeout", "0"])]
    #[case(&["--refresh-interval", "0"])]
    #[case(&["--log-level", "loud"])]
    #[case(&["--check-mode", "relay"])]
    #[case(&["--enable-relay", "--relay-port-start", "600", "--relay-port-end", "500"])]
    fn test_invalid_args(#[case] args: &[&str]) {
        assert!(parse(args).validate().is_err());
    }

    #[rstest]
    #[case(&["--check-mode", "relay", "--enable-relay"])]
    #[case(&["--check-mode", "relay", "--relay-url", "http://relay.local:54321"])]
    fn test_relay_mode_needs_a_relay(#[case] args: &[&str]) {
        assert!(parse(args).validate().is_ok());
    }

    #[test]
    fn test_check_mode_from_str() {
        assert_eq!("RELAY".parse::<CheckMode>().unwrap(), CheckMode::Relay);
        assert!("carrier-pigeon".parse::<CheckMode>().is_err());
    }
}
