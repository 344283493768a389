//! Network diagnostics dashboard backend.
//!
//! Stateless tool endpoints (ping, DNS lookup, port scan, TLS
//! certificate inspection, IP geolocation, connection listing) next to a
//! WebSocket channel that streams per-interval network throughput
//! deltas, with one background sampler task per connected client.

pub mod api;
pub mod config;
pub mod error;
pub mod monitor;
pub mod server;
pub mod telemetry;
pub mod tools;

pub use config::NetdashConfig;
pub use error::{NetdashError, Result};
