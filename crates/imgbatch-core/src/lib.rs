//! imgbatch Core Library
//!
//! This crate provides the domain models, error types, configuration and the
//! transform engine capability shared by every imgbatch component.

pub mod config;
pub mod data_url;
pub mod engine;
pub mod error;
pub mod format;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use data_url::DataUrl;
pub use engine::{
    Dispatch, EngineMode, ItemProgress, NoProgress, TransformEngine, TransformInput,
    TransformOutput,
};
pub use error::{AppError, AppResult, LogLevel};
pub use format::{format_bytes, safe_name};
pub use models::{
    Item, ItemId, ItemState, Preset, ProcessedOutput, SizeSummary, SourceSet, TransformConfig,
};
