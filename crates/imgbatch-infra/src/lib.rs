//! imgbatch Infrastructure Library
//!
//! Shared infrastructure used by the worker and the CLI:
//! - Telemetry initialization (tracing subscriber)
//! - Archive creation for exports

#[cfg(feature = "observability-basic")]
pub mod telemetry;

#[cfg(feature = "archive")]
pub mod archive;

// Re-export commonly used types
#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry};

#[cfg(feature = "archive")]
pub use archive::{archive_file_name, create_zip_archive, unique_name, ArchiveEntry};
