pub mod item;
pub mod source_set;
pub mod summary;
pub mod transform;

pub use item::{Item, ItemId, ItemState, ProcessedOutput};
pub use source_set::SourceSet;
pub use summary::SizeSummary;
pub use transform::{Preset, TransformConfig};
