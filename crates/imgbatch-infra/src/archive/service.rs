use bytes::Bytes;
use chrono::{DateTime, Utc};
use imgbatch_core::{safe_name, AppError, AppResult};
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

/// One file to place in an archive
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Bytes,
}

impl ArchiveEntry {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// `resized_<unix-millis>.zip`
pub fn archive_file_name(now: DateTime<Utc>) -> String {
    format!("resized_{}.zip", now.timestamp_millis())
}

/// Sanitize filename for archive entry to prevent path traversal.
/// Extracts only the base name (strips path components like `../`) and
/// replaces whitespace.
fn sanitize_archive_filename(filename: &str, fallback: &str) -> String {
    let base = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or(fallback);
    safe_name(base)
}

/// Make `name` unique within `used` by appending `_<n>` before the extension
pub fn unique_name(name: String, used: &mut HashSet<String>) -> String {
    if used.insert(name.clone()) {
        return name;
    }

    let path = Path::new(&name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(&name)
        .to_string();
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_string);

    let mut counter = 1;
    loop {
        let candidate = match &extension {
            Some(ext) => format!("{}_{}.{}", stem, counter, ext),
            None => format!("{}_{}", stem, counter),
        };
        if used.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}

/// Create a ZIP archive from entries.
///
/// `on_progress` receives the percentage of entries written, ending with 100.
pub fn create_zip_archive<F>(entries: &[ArchiveEntry], mut on_progress: F) -> AppResult<Vec<u8>>
where
    F: FnMut(u8),
{
    use zip::write::{FileOptions, ZipWriter};
    use zip::CompressionMethod;

    let total = entries.len();
    let mut used = HashSet::with_capacity(total);
    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(std::io::Cursor::new(&mut buffer));
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        on_progress(0);
        for (index, entry) in entries.iter().enumerate() {
            let fallback = format!("image_{}", index + 1);
            let safe_filename =
                unique_name(sanitize_archive_filename(&entry.name, &fallback), &mut used);

            zip.start_file(safe_filename.as_str(), options)
                .map_err(|e| {
                    AppError::Archive(format!("Failed to add file to ZIP: {}: {}", safe_filename, e))
                })?;
            zip.write_all(&entry.bytes)?;

            on_progress((((index + 1) * 100) / total) as u8);
        }

        zip.finish()
            .map_err(|e| AppError::Archive(format!("Failed to finalize ZIP archive: {}", e)))?;
    }

    if total == 0 {
        on_progress(100);
    }

    tracing::debug!(entries = total, bytes = buffer.len(), "ZIP archive created");
    Ok(buffer)
}
