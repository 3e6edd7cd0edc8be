//! imgbatch Media Processing Library
//!
//! This crate provides the local transform engine (decode, fit-inside resize,
//! JPEG re-encode) and the ingestion validator that decides which files are images.

pub mod image;
pub mod validator;

// Re-export commonly used types
pub use self::image::{encode_jpeg, fit_inside, LocalTransformEngine, OUTPUT_CONTENT_TYPE};
pub use validator::{ImageValidator, ValidationError};
