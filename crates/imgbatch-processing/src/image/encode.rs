use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView};
use imgbatch_core::{AppError, AppResult};

/// Every local transform produces JPEG
pub const OUTPUT_CONTENT_TYPE: &str = "image/jpeg";

/// Encode an image as JPEG at `quality` (clamped to 1..=100).
///
/// JPEG has no alpha channel; transparent pixels keep their color values and
/// lose their transparency.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> AppResult<Bytes> {
    let quality = quality.clamp(1, 100);
    let (width, height) = img.dimensions();

    let mut buffer = Vec::with_capacity((width as usize * height as usize) / 4);
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| AppError::Encode(e.to_string()))?;

    Ok(Bytes::from(buffer))
}
