//! Batch coordination for imgbatch
//!
//! A [`Session`] owns the loaded items. A [`BatchCoordinator`] runs one batch
//! at a time through whichever [`TransformEngine`](imgbatch_core::TransformEngine)
//! was selected and writes results back by item id.

pub mod coordinator;
pub mod export;
pub mod preview;
pub mod progress;
pub mod report;
pub mod session;
pub mod status;

pub use coordinator::BatchCoordinator;
pub use export::{export_archive, ExportedArchive};
pub use preview::PreviewCache;
pub use progress::{BatchEvent, ChannelSink, NullSink, OverallProgress, ProgressSink};
pub use report::{ItemFailure, RunReport};
pub use session::{BusyGuard, IngestReport, Session};
