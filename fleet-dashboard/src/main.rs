use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

pub mod api;
pub mod config;
pub mod notifications;

use api::{api_routes, ApiState};
use config::{CheckMode, Config};
use device_registry::DeviceRegistry;
use health_check::{HealthCheckConfig, HealthChecker, HttpHealthChecker, RelayHealthChecker};
use notifications::NotificationLog;
use relay_server::RelayServer;
use scan_orchestrator::{DeviceManager, Notifier};

/// Initialize tracing with the configured level; `RUST_LOG` takes precedence
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = match log_level.to_lowercase().as_str() {
        "error" => "error",
        "warn" => "warn",
        "debug" => "debug",
        "trace" => "trace",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    Ok(())
}

fn print_banner() {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                      Fleet Dashboard                         ║");
    println!("║                                                              ║");
    println!("║  • Device registry with playback and content controls       ║");
    println!("║  • Health scans, pings and periodic auto-refresh            ║");
    println!("║  • JSON API under /api                                      ║");
    println!("║                                                              ║");
    println!("║  Press Ctrl+C to stop                                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

/// Build the checker the dashboard uses, given an optional local relay
fn build_checker(config: &Config, relay: Option<&RelayServer>) -> Result<Arc<dyn HealthChecker>> {
    let health_config = HealthCheckConfig::default()
        .with_port(config.probe_port)
        .with_timeout(config.probe_timeout);

    let checker: Arc<dyn HealthChecker> = match config.check_mode {
        CheckMode::Direct => Arc::new(
            HttpHealthChecker::new(health_config).context("Failed to create health checker")?,
        ),
        CheckMode::Relay => {
            let base = config
                .relay_url
                .clone()
                .or_else(|| relay.map(|r| r.base_url().to_string()))
                .context("Relay check mode needs a relay URL or a local relay")?;
            info!("Health checks go through relay at {}", base);
            Arc::new(
                RelayHealthChecker::new(&base, &health_config)
                    .with_context(|| format!("Invalid relay URL '{}'", base))?,
            )
        }
    };

    Ok(checker)
}

async fn start_relay(config: &Config) -> Result<Option<RelayServer>> {
    if !config.enable_relay {
        return Ok(None);
    }

    let relay_checker = HttpHealthChecker::new(
        HealthCheckConfig::default()
            .with_port(config.probe_port)
            .with_timeout(config.probe_timeout),
    )
    .context("Failed to create relay health checker")?;

    let relay = RelayServer::new(config.relay_port_range, Arc::new(relay_checker))
        .await
        .context("Failed to start relay server")?;
    info!("Relay server listening at {}", relay.endpoint_url());
    Ok(Some(relay))
}

/// Run the daemon until Ctrl+C
async fn run(config: Config) -> Result<()> {
    let relay = start_relay(&config).await?;
    let checker = build_checker(&config, relay.as_ref())?;

    let (notifier, notification_rx) = Notifier::channel();
    let notifications = NotificationLog::default();
    let collector = notifications.collect(notification_rx);

    let manager = DeviceManager::new(DeviceRegistry::new(), checker, notifier);

    for address in &config.devices {
        match manager.add_device(address, None).await {
            Ok(device) => info!("Registered {} ({})", device.name, device.status),
            Err(e) => warn!("Skipping startup device '{}': {}", address, e),
        }
    }

    let auto_refresh = if config.auto_refresh {
        Some(manager.start_auto_refresh(config.refresh_interval, config.check_delay))
    } else {
        None
    };

    let routes = api_routes(ApiState {
        manager: manager.clone(),
        notifications,
    });

    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown((config.bind, config.api_port), async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
        })
        .with_context(|| format!("Failed to bind dashboard API on {}:{}", config.bind, config.api_port))?;

    info!("Dashboard API listening on http://{}/api", addr);
    server.await;

    info!("Shutting down...");
    if let Some(auto_refresh) = auto_refresh {
        auto_refresh.shutdown().await;
    }
    if let Some(relay) = relay {
        relay.shutdown().await;
    }
    drop(manager);
    collector.abort();

    info!("Fleet dashboard stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to parse configuration")?;

    init_tracing(&config.log_level).context("Failed to initialize logging")?;

    print_banner();
    config.print_summary();

    if let Err(e) = run(config).await {
        error!("Fleet dashboard failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
