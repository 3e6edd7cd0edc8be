//! Archive creation
//!
//! Packs processed images into a single ZIP with filesystem-safe entry names.

pub use service::{archive_file_name, create_zip_archive, unique_name, ArchiveEntry};

mod service;
