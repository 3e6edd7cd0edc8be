//! Telemetry initialization
//!
//! Only the basic tracing subscriber is provided; there is no exporter.

mod init_basic;

pub use init_basic::{init_telemetry, shutdown_telemetry};
