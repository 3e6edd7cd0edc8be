use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Compute output dimensions that fit inside the target box while keeping the
/// native aspect ratio.
///
/// With no target at all the native size is returned unchanged. A missing single
/// dimension is taken from the native size. The scale can be above 1, so small
/// sources are enlarged up to the box.
pub fn fit_inside(
    native_width: u32,
    native_height: u32,
    target_width: Option<u32>,
    target_height: Option<u32>,
) -> (u32, u32) {
    if native_width == 0 || native_height == 0 {
        return (native_width, native_height);
    }

    if target_width.is_none() && target_height.is_none() {
        return (native_width, native_height);
    }

    let box_width = target_width.unwrap_or(native_width) as f64;
    let box_height = target_height.unwrap_or(native_height) as f64;

    let ratio = (box_width / native_width as f64).min(box_height / native_height as f64);

    let width = (native_width as f64 * ratio).round().max(1.0) as u32;
    let height = (native_height as f64 * ratio).round().max(1.0) as u32;
    (width, height)
}

/// Image resize operations
pub struct ImageResize;

impl ImageResize {
    /// Select a resampling filter from the scale ratio
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> FilterType {
        let width_ratio = orig_width as f32 / new_width as f32;
        let height_ratio = orig_height as f32 / new_height as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            FilterType::Triangle
        } else if max_ratio > 1.5 {
            FilterType::CatmullRom
        } else {
            FilterType::Lanczos3
        }
    }

    /// Render `img` onto a surface of exactly `width` x `height`
    pub fn resize_to(img: DynamicImage, width: u32, height: u32) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        if (orig_width, orig_height) == (width, height) {
            return img;
        }

        let filter = Self::select_filter(orig_width, orig_height, width, height);
        img.resize_exact(width, height, filter)
    }
}
