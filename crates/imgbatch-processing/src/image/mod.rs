//! Local image transform module
//!
//! - Fit-inside geometry and resampling (resize)
//! - Fixed-format output encoding (encode)
//! - The local engine tying decode, resize and encode together (engine)

pub mod encode;
pub mod engine;
pub mod resize;

pub use encode::{encode_jpeg, OUTPUT_CONTENT_TYPE};
pub use engine::LocalTransformEngine;
pub use resize::{fit_inside, ImageResize};
