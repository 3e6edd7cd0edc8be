use image::ImageFormat;
use imgbatch_core::AppError;
use std::path::Path;

/// Reasons a file is not accepted into a source set
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Not an image: {0}")]
    NotAnImage(String),

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Empty file: {0}")]
    EmptyFile(String),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::UnsupportedInput(err.to_string())
    }
}

/// Ingestion validator
///
/// Mirrors a file picker's `image/*` filter: a file is accepted when its
/// extension or its leading bytes identify an image format.
#[derive(Debug, Clone)]
pub struct ImageValidator {
    max_file_size: u64,
}

impl ImageValidator {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    /// Detect the image MIME type from the filename, then from the content
    pub fn content_type_for(name: &str, data: &[u8]) -> Option<String> {
        ImageFormat::from_path(Path::new(name))
            .ok()
            .or_else(|| image::guess_format(data).ok())
            .map(|format| format.to_mime_type().to_string())
            .filter(|mime| mime.starts_with("image/"))
    }

    /// Validate a candidate file and return its content type
    pub fn accept(&self, name: &str, data: &[u8]) -> Result<String, ValidationError> {
        let content_type = Self::content_type_for(name, data)
            .ok_or_else(|| ValidationError::NotAnImage(name.to_string()))?;

        let size = data.len() as u64;
        if size == 0 {
            return Err(ValidationError::EmptyFile(name.to_string()));
        }
        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(content_type)
    }
}
