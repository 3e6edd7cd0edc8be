//! Local transform engine - decode, fit-inside resize, JPEG re-encode

use async_trait::async_trait;
use bytes::Bytes;
use image::GenericImageView;
use imgbatch_core::{
    AppError, AppResult, Dispatch, EngineMode, ItemProgress, TransformConfig, TransformEngine,
    TransformInput, TransformOutput,
};
use std::io::Cursor;

use super::encode::{encode_jpeg, OUTPUT_CONTENT_TYPE};
use super::resize::{fit_inside, ImageResize};

/// Transforms images in-process with the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTransformEngine;

impl LocalTransformEngine {
    pub fn new() -> Self {
        Self
    }

    /// Decode, resize and re-encode one image. Returns the output bytes and
    /// the output dimensions.
    pub fn transform_bytes(
        name: &str,
        data: &[u8],
        config: &TransformConfig,
    ) -> AppResult<(Bytes, (u32, u32))> {
        let img = image::ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| AppError::decode(name, e))?
            .decode()
            .map_err(|e| AppError::decode(name, e))?;

        let (native_width, native_height) = img.dimensions();
        let (width, height) = fit_inside(
            native_width,
            native_height,
            config.target_width,
            config.target_height,
        );

        tracing::debug!(
            name = %name,
            native_width,
            native_height,
            width,
            height,
            quality = config.quality,
            "Transforming image"
        );

        let resized = ImageResize::resize_to(img, width, height);
        let output = encode_jpeg(&resized, config.quality)?;
        Ok((output, (width, height)))
    }

    /// Transform one input off the async executor
    pub async fn transform_input(
        &self,
        input: &TransformInput,
        config: &TransformConfig,
    ) -> AppResult<TransformOutput> {
        let name = input.name.clone();
        let data = input.bytes.clone();
        let config = *config;

        let (bytes, _) = tokio::task::spawn_blocking(move || {
            Self::transform_bytes(&name, &data, &config)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Transform task failed: {}", e)))??;

        Ok(TransformOutput {
            id: input.id,
            content_type: OUTPUT_CONTENT_TYPE.to_string(),
            bytes,
        })
    }
}

#[async_trait]
impl TransformEngine for LocalTransformEngine {
    fn mode(&self) -> EngineMode {
        EngineMode::Local
    }

    fn dispatch(&self) -> Dispatch {
        Dispatch::PerItem
    }

    async fn transform(
        &self,
        inputs: &[TransformInput],
        config: &TransformConfig,
        progress: &dyn ItemProgress,
    ) -> AppResult<Vec<TransformOutput>> {
        let total = inputs.len();
        let mut outputs = Vec::with_capacity(total);

        for (index, input) in inputs.iter().enumerate() {
            outputs.push(self.transform_input(input, config).await?);
            progress.report((((index + 1) * 100) / total) as u8);
        }

        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use imgbatch_core::{ItemId, Preset};
    use std::sync::Mutex;

    fn create_test_image(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 90, 255])
        });
        let mut buffer = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn input(id: u64, data: Vec<u8>) -> TransformInput {
        TransformInput {
            id: ItemId(id),
            name: format!("image-{}.png", id),
            content_type: "image/png".to_string(),
            bytes: Bytes::from(data),
        }
    }

    fn output_dimensions(data: &[u8]) -> (u32, u32) {
        image::load_from_memory(data).unwrap().dimensions()
    }

    #[test]
    fn test_native_size_is_kept() {
        let data = create_test_image(300, 200);
        let config = TransformConfig::resolve(Preset::Original, 80);
        let (output, dims) = LocalTransformEngine::transform_bytes("a.png", &data, &config).unwrap();
        assert_eq!(dims, (300, 200));
        assert_eq!(output_dimensions(&output), (300, 200));
        assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_fit_inside_square() {
        let data = create_test_image(400, 200);
        let config = TransformConfig {
            target_width: Some(100),
            target_height: Some(100),
            quality: 80,
        };
        let (output, dims) = LocalTransformEngine::transform_bytes("a.png", &data, &config).unwrap();
        assert_eq!(dims, (100, 50));
        assert_eq!(output_dimensions(&output), (100, 50));
    }

    #[test]
    fn test_decode_error() {
        let config = TransformConfig::resolve(Preset::Square, 80);
        let err = LocalTransformEngine::transform_bytes("broken.png", b"not an image", &config)
            .unwrap_err();
        assert!(matches!(err, AppError::Decode { ref name, .. } if name == "broken.png"));
    }

    #[test]
    fn test_transform_is_idempotent() {
        let data = create_test_image(120, 90);
        let config = TransformConfig::resolve(Preset::Widescreen, 75);
        let (first, _) = LocalTransformEngine::transform_bytes("a.png", &data, &config).unwrap();
        let (second, _) = LocalTransformEngine::transform_bytes("a.png", &data, &config).unwrap();
        assert_eq!(first.len(), second.len());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_engine_reports_completion() {
        let engine = LocalTransformEngine::new();
        let inputs = vec![input(1, create_test_image(50, 50)), input(2, create_test_image(60, 30))];
        let config = TransformConfig::resolve(Preset::Original, 80);

        let seen = Mutex::new(Vec::new());
        let progress = |p: u8| seen.lock().unwrap().push(p);
        let outputs = engine.transform(&inputs, &config, &progress).await.unwrap();

        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].id, ItemId(1));
        assert_eq!(outputs[1].id, ItemId(2));
        assert_eq!(outputs[1].size(), outputs[1].bytes.len() as u64);
        assert_eq!(*seen.lock().unwrap(), vec![50, 100]);
        assert_eq!(engine.dispatch(), Dispatch::PerItem);
        assert_eq!(engine.mode(), EngineMode::Local);
    }

    #[tokio::test]
    async fn test_engine_propagates_decode_error() {
        let engine = LocalTransformEngine::new();
        let inputs = vec![input(1, b"garbage".to_vec())];
        let config = TransformConfig::resolve(Preset::Square, 80);

        let result = engine
            .transform(&inputs, &config, &imgbatch_core::NoProgress)
            .await;
        assert!(matches!(result, Err(AppError::Decode { .. })));
    }
}
