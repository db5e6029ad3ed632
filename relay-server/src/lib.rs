//! Health-check relay.
//!
//! Browsers cannot always reach devices on a store network directly:
//! cross-origin rules and mixed-content blocking get in the way. The relay
//! runs next to the devices and performs the check server-side.
//!
//! # Endpoint
//!
//! `POST /check-device-health` with `{"ipAddress": "<address>"}`:
//!
//! | Case | Status | Body |
//! |------|--------|------|
//! | Check ran (online or not) | 200 | `{"status", "hostname"?, "error"?}` |
//! | Missing address / bad JSON | 400 | `{"error"}` |
//! | Body over 16 KiB | 413 | `{"error": "Request body too large"}` |
//! | Other method | 405 | `{"error": "Method not allowed"}` |
//! | `OPTIONS` | 200 | empty (CORS preflight) |
//! | Internal fault | 500 | `{"status": "offline", "error": "Internal server error"}` |
//!
//! Every response carries `Access-Control-Allow-Origin: *`.

mod error;
pub mod routes;
mod server;

pub use error::RelayError;
pub use routes::{cors_headers, relay_routes, CORS_ALLOW_HEADERS};
pub use server::RelayServer;
