//! Helpers shared by the `imgbatch` binary

use anyhow::Context;
use bytes::Bytes;
use imgbatch_api_client::{ApiClient, RemoteTransformClient};
use imgbatch_core::{format_bytes, safe_name, Config, EngineMode, Item, ItemId, TransformEngine};
use imgbatch_infra::unique_name;
use imgbatch_processing::LocalTransformEngine;
use imgbatch_worker::{status, BatchEvent, ProgressSink};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

const BAR_WIDTH: usize = 30;

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays clean.
pub fn init_tracing(json: bool) -> anyhow::Result<()> {
    imgbatch_infra::init_telemetry("imgbatch=info", json)
}

/// Read the given files. Directories are expanded one level, in name order.
pub async fn collect_files(paths: &[PathBuf]) -> anyhow::Result<Vec<(String, Bytes)>> {
    let mut files = Vec::new();

    for path in paths {
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Cannot access {}", path.display()))?;

        if metadata.is_dir() {
            let mut entries = Vec::new();
            let mut dir = tokio::fs::read_dir(path)
                .await
                .with_context(|| format!("Cannot read directory {}", path.display()))?;
            while let Some(entry) = dir.next_entry().await? {
                if entry.file_type().await?.is_file() {
                    entries.push(entry.path());
                }
            }
            entries.sort();
            for entry in entries {
                files.push(read_file(&entry).await?);
            }
        } else {
            files.push(read_file(path).await?);
        }
    }

    Ok(files)
}

async fn read_file(path: &Path) -> anyhow::Result<(String, Bytes)> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Cannot read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok((name, Bytes::from(data)))
}

/// Engine for the selected mode
pub fn build_engine(
    mode: EngineMode,
    config: &Config,
) -> anyhow::Result<Box<dyn TransformEngine>> {
    match mode {
        EngineMode::Local => Ok(Box::new(LocalTransformEngine::new())),
        EngineMode::Remote => {
            let api = ApiClient::from_config(config).context("Failed to create API client")?;
            Ok(Box::new(RemoteTransformClient::with_path(
                api,
                config.api_path.clone(),
            )))
        }
    }
}

/// Write processed outputs into `dir`, returning the written paths.
///
/// Existing files are never overwritten, so running from the source
/// directory keeps the originals. Clashing names get a `_<n>` suffix.
pub async fn write_outputs(items: &[Item], dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Cannot create {}", dir.display()))?;

    let mut used = HashSet::new();
    let mut written = Vec::new();
    for item in items {
        let Some(processed) = item.processed() else {
            continue;
        };
        let name = safe_name(item.name());
        let path = loop {
            let path = dir.join(unique_name(name.clone(), &mut used));
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(processed.bytes())
                        .await
                        .with_context(|| format!("Cannot write {}", path.display()))?;
                    file.flush()
                        .await
                        .with_context(|| format!("Cannot write {}", path.display()))?;
                    break path;
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    tracing::debug!(path = %path.display(), "Output exists, picking another name");
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("Cannot write {}", path.display()));
                }
            }
        };
        written.push(path);
    }
    Ok(written)
}

/// `[#######.......]  50%`
pub fn progress_bar(percent: u8, width: usize) -> String {
    let percent = percent.min(100) as usize;
    let filled = percent * width / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        ".".repeat(width - filled),
        percent
    )
}

/// Prints batch events to stderr
pub struct TerminalSink {
    names: HashMap<ItemId, String>,
    mode: EngineMode,
}

impl TerminalSink {
    pub fn new(items: &[Item], mode: EngineMode) -> Self {
        Self {
            names: items
                .iter()
                .map(|item| (item.id(), item.name().to_string()))
                .collect(),
            mode,
        }
    }

    fn name(&self, id: ItemId) -> String {
        self.names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }
}

impl ProgressSink for TerminalSink {
    fn emit(&self, event: BatchEvent) {
        let mut err = std::io::stderr().lock();
        // Terminal output is best effort
        let _ = match event {
            BatchEvent::Started { total, mode } => {
                writeln!(err, "Processing {} images ({} mode)", total, mode)
            }
            BatchEvent::Progress { percent } => {
                write!(err, "\r{}", progress_bar(percent, BAR_WIDTH))
                    .and_then(|_| if percent == 100 { writeln!(err) } else { Ok(()) })
            }
            BatchEvent::ItemCompleted { id, size } => writeln!(
                err,
                "\r{}",
                status::item_processed(&self.name(id), size, self.mode)
            ),
            BatchEvent::ItemFailed { id, error } => {
                writeln!(err, "\rFailed {}: {}", self.name(id), error)
            }
            BatchEvent::Aborted { error } => writeln!(err, "\nBatch aborted: {}", error),
            BatchEvent::Finished { report } => writeln!(
                err,
                "Done: {} processed, {} failed ({} saved)",
                report.processed.len(),
                report.failed.len(),
                format_bytes(report.summary.saved().max(0) as u64)
            ),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0, 10), "[..........]   0%");
        assert_eq!(progress_bar(50, 10), "[#####.....]  50%");
        assert_eq!(progress_bar(100, 10), "[##########] 100%");
        assert_eq!(progress_bar(250, 4), "[####] 100%");
    }

    #[tokio::test]
    async fn test_collect_files_expands_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("batch");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(nested.join("b.png"), b"bb").unwrap();
        std::fs::write(nested.join("a.png"), b"a").unwrap();
        std::fs::create_dir(nested.join("deeper")).unwrap();
        std::fs::write(nested.join("deeper").join("c.png"), b"c").unwrap();
        let single = dir.path().join("single.jpg");
        std::fs::write(&single, b"single").unwrap();

        let files = collect_files(&[nested, single]).await.unwrap();
        let names: Vec<&str> = files.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.png", "single.jpg"]);
        assert_eq!(files[1].1.as_ref(), b"bb");
    }

    #[tokio::test]
    async fn test_collect_files_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = collect_files(&[dir.path().join("missing.png")]).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_write_outputs_only_processed() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = imgbatch_core::SourceSet::new();
        let done = set.insert("summer trip.png", "image/png", Bytes::from_static(b"raw"));
        set.insert("pending.png", "image/png", Bytes::from_static(b"raw"));
        set.get_mut(done)
            .unwrap()
            .set_processed(Bytes::from_static(b"jpeg"));
        let items: Vec<Item> = set.iter().cloned().collect();

        let written = write_outputs(&items, dir.path()).await.unwrap();
        assert_eq!(written, vec![dir.path().join("summer_trip.png")]);
        assert_eq!(std::fs::read(&written[0]).unwrap(), b"jpeg");
    }

    #[tokio::test]
    async fn test_write_outputs_keeps_sources_and_dedupes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("photo.png"), b"ORIGINAL-SOURCE").unwrap();

        let mut set = imgbatch_core::SourceSet::new();
        let first = set.insert("photo.png", "image/png", Bytes::from_static(b"raw-a"));
        let second = set.insert("photo.png", "image/png", Bytes::from_static(b"raw-b"));
        set.get_mut(first)
            .unwrap()
            .set_processed(Bytes::from_static(b"jpeg-A"));
        set.get_mut(second)
            .unwrap()
            .set_processed(Bytes::from_static(b"jpeg-B"));
        let items: Vec<Item> = set.iter().cloned().collect();

        let written = write_outputs(&items, dir.path()).await.unwrap();
        assert_eq!(
            written,
            vec![dir.path().join("photo_1.png"), dir.path().join("photo_2.png")]
        );
        assert_eq!(
            std::fs::read(dir.path().join("photo.png")).unwrap(),
            b"ORIGINAL-SOURCE"
        );
        assert_eq!(std::fs::read(&written[0]).unwrap(), b"jpeg-A");
        assert_eq!(std::fs::read(&written[1]).unwrap(), b"jpeg-B");

        // A second run into the same directory leaves the first run's files alone
        let again = write_outputs(&items[..1], dir.path()).await.unwrap();
        assert_eq!(again, vec![dir.path().join("photo_3.png")]);
        assert_eq!(std::fs::read(&written[0]).unwrap(), b"jpeg-A");
    }

    #[test]
    fn test_build_engine_modes() {
        let config = Config::default();
        let local = build_engine(EngineMode::Local, &config).unwrap();
        assert_eq!(local.mode(), EngineMode::Local);
        let remote = build_engine(EngineMode::Remote, &config).unwrap();
        assert_eq!(remote.mode(), EngineMode::Remote);
    }
}
