//! HTTP server hosting the relay endpoint.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener};
use std::sync::Arc;

use health_check::{HealthChecker, RELAY_PATH};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::RelayError;
use crate::routes::relay_routes;

/// Relay server performing health checks for remote clients.
///
/// Binds the first free port in a range, serves
/// `POST /check-device-health`, and shuts down gracefully.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use health_check::{HealthCheckConfig, HttpHealthChecker};
/// use relay_server::RelayServer;
///
/// #[tokio::main]
/// async fn main() {
///     let checker = HttpHealthChecker::new(HealthCheckConfig::default()).unwrap();
///     let server = RelayServer::new((3400, 3500), Arc::new(checker))
///         .await
///         .expect("Failed to start relay");
///
///     println!("Relay listening at: {}", server.endpoint_url());
///     server.shutdown().await;
/// }
/// ```
pub struct RelayServer {
    /// The port the server is bound to
    port: u16,
    /// Base URL clients use to reach the relay
    base_url: String,
    shutdown_tx: Option<mpsc::Sender<()>>,
    server_handle: Option<JoinHandle<()>>,
}

impl RelayServer {
    /// Start a relay on all interfaces, on the first free port in `port_range`.
    pub async fn new(
        port_range: (u16, u16),
        checker: Arc<dyn HealthChecker>,
    ) -> Result<Self, RelayError> {
        Self::bind(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port_range, checker).await
    }

    /// Start a relay on a specific interface.
    ///
    /// A range of `(0, 0)` lets the OS pick the port.
    pub async fn bind(
        bind_ip: IpAddr,
        port_range: (u16, u16),
        checker: Arc<dyn HealthChecker>,
    ) -> Result<Self, RelayError> {
        let port = Self::find_available_port(bind_ip, port_range.0, port_range.1).ok_or(
            RelayError::NoAvailablePort {
                start: port_range.0,
                end: port_range.1,
            },
        )?;

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let (addr, server) = warp::serve(relay_routes(checker))
            .try_bind_with_graceful_shutdown(SocketAddr::new(bind_ip, port), async move {
                shutdown_rx.recv().await;
            })
            .map_err(|e| RelayError::StartupFailed(e.to_string()))?;

        let host = if bind_ip.is_unspecified() {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            bind_ip
        };
        let base_url = format!("http://{}", SocketAddr::new(host, addr.port()));

        tracing::info!("Relay server listening on {addr}");
        let server_handle = tokio::spawn(server);

        Ok(Self {
            port: addr.port(),
            base_url,
            shutdown_tx: Some(shutdown_tx),
            server_handle: Some(server_handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `http://<host>:<port>`, the base to hand to a relay client
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of the health endpoint
    pub fn endpoint_url(&self) -> String {
        format!("{}/{}", self.base_url, RELAY_PATH)
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }

        if let Some(handle) = self.server_handle.take() {
            let _ = handle.await;
        }
        tracing::info!("Relay server on port {} stopped", self.port);
    }

    fn find_available_port(bind_ip: IpAddr, start: u16, end: u16) -> Option<u16> {
        (start..=end).find(|&port| Self::is_port_available(bind_ip, port))
    }

    fn is_port_available(bind_ip: IpAddr, port: u16) -> bool {
        TcpListener::bind(SocketAddr::new(bind_ip, port)).is_ok()
    }
}

impl Drop for RelayServer {
    fn drop(&mut self) {
        // Dropped without shutdown(): stop the server task anyway
        if let Some(handle) = self.server_handle.take() {
            handle.abort();
        }
    }
}
