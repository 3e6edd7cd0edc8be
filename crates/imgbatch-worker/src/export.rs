//! Archive export of processed images

use bytes::Bytes;
use chrono::Utc;
use imgbatch_core::{AppResult, TransformConfig, TransformInput};
use imgbatch_infra::{archive_file_name, create_zip_archive, ArchiveEntry};
use imgbatch_processing::LocalTransformEngine;
use std::path::{Path, PathBuf};

use crate::session::Session;

/// A finished archive ready to be written out
#[derive(Debug, Clone)]
pub struct ExportedArchive {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Number of images in the archive
    pub entries: usize,
    /// Names of images that could not be transformed and were left out
    pub skipped: Vec<String>,
}

impl ExportedArchive {
    /// Write the archive into `dir` and return its path
    pub async fn write_to(&self, dir: &Path) -> AppResult<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(&self.file_name);
        tokio::fs::write(&path, &self.bytes).await?;
        tracing::info!(path = %path.display(), bytes = self.bytes.len(), "Archive written");
        Ok(path)
    }
}

/// Pack every item of the session into a ZIP.
///
/// Processed bytes are used when present. Other items are transformed on
/// demand with `fallback` and `config`; those results are not stored back on
/// the session.
pub async fn export_archive<F>(
    session: &Session,
    fallback: &LocalTransformEngine,
    config: &TransformConfig,
    on_progress: F,
) -> AppResult<ExportedArchive>
where
    F: FnMut(u8),
{
    let _guard = session.begin_run()?;
    let items = session.items().await;

    let mut entries = Vec::with_capacity(items.len());
    let mut skipped = Vec::new();
    for item in &items {
        let bytes: Bytes = match item.processed() {
            Some(processed) => processed.bytes().clone(),
            None => {
                let input = TransformInput {
                    id: item.id(),
                    name: item.name().to_string(),
                    content_type: item.content_type().to_string(),
                    bytes: item.raw_bytes().clone(),
                };
                match fallback.transform_input(&input, config).await {
                    Ok(output) => output.bytes,
                    Err(e) => {
                        tracing::warn!(item = %item.id(), error = %e, "Skipping item in export");
                        skipped.push(item.name().to_string());
                        continue;
                    }
                }
            }
        };
        entries.push(ArchiveEntry::new(item.name(), bytes));
    }

    let bytes = create_zip_archive(&entries, on_progress)?;
    let archive = ExportedArchive {
        file_name: archive_file_name(Utc::now()),
        bytes,
        entries: entries.len(),
        skipped,
    };

    tracing::info!(
        file_name = %archive.file_name,
        entries = archive.entries,
        skipped = archive.skipped.len(),
        "Archive exported"
    );
    Ok(archive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use imgbatch_core::{AppError, ItemId, ItemState, Preset};
    use imgbatch_processing::ImageValidator;
    use std::io::{Cursor, Read};

    fn create_test_image(width: u32, height: u32) -> Bytes {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 3 % 256) as u8, (y * 5 % 256) as u8, 40, 255])
        });
        let mut buffer = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        Bytes::from(buffer)
    }

    fn archive_names(data: &[u8]) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data)).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_export_uses_processed_or_fallback() {
        let session = Session::new(ImageValidator::new(10 * 1024 * 1024));
        session
            .ingest(vec![
                ("my photo.png".to_string(), create_test_image(40, 20)),
                ("other.png".to_string(), create_test_image(10, 10)),
                ("broken.png".to_string(), Bytes::from_static(b"not really")),
            ])
            .await;

        {
            let mut state = session.lock().await;
            state
                .items
                .get_mut(ItemId(1))
                .unwrap()
                .set_processed(Bytes::from_static(b"already done"));
        }

        let mut progress = Vec::new();
        let config = TransformConfig::resolve(Preset::Original, 80);
        let archive = export_archive(&session, &LocalTransformEngine::new(), &config, |p| {
            progress.push(p)
        })
        .await
        .unwrap();

        assert!(archive.file_name.starts_with("resized_"));
        assert!(archive.file_name.ends_with(".zip"));
        assert_eq!(archive.entries, 2);
        assert_eq!(archive.skipped, vec!["broken.png"]);
        assert_eq!(archive_names(&archive.bytes), vec!["my_photo.png", "other.png"]);
        assert_eq!(progress.last(), Some(&100));

        let mut zip = zip::ZipArchive::new(Cursor::new(&archive.bytes[..])).unwrap();
        let mut content = Vec::new();
        zip.by_name("other.png")
            .unwrap()
            .read_to_end(&mut content)
            .unwrap();
        assert_eq!(content, b"already done");

        // The on-demand transform is not written back
        let first = session.get(ItemId(0)).await.unwrap();
        assert_eq!(first.state(), ItemState::Loaded);
        assert!(first.processed().is_none());
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_export_rejected_while_busy() {
        let session = Session::new(ImageValidator::new(1024));
        let _guard = session.begin_run().unwrap();
        let config = TransformConfig::resolve(Preset::Original, 80);

        let result = export_archive(&session, &LocalTransformEngine::new(), &config, |_| {}).await;
        assert!(matches!(result, Err(AppError::Busy)));
    }

    #[tokio::test]
    async fn test_write_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let archive = ExportedArchive {
            file_name: "resized_1.zip".to_string(),
            bytes: b"PK".to_vec(),
            entries: 0,
            skipped: Vec::new(),
        };
        let path = archive.write_to(&dir.path().join("out")).await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"PK");
    }
}
