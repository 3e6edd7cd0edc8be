//! Session state shared by every batch operation

use bytes::Bytes;
use imgbatch_core::{AppError, AppResult, Config, Item, ItemId, SizeSummary, SourceSet};
use imgbatch_processing::ImageValidator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use crate::preview::PreviewCache;

/// Outcome of an ingestion call
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub accepted: Vec<ItemId>,
    /// Names of files that were filtered out
    pub skipped: Vec<String>,
}

#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub(crate) items: SourceSet,
    pub(crate) previews: PreviewCache,
}

/// Loaded items plus the run guard.
///
/// At most one batch run or export is in flight per session. Removal and
/// reset are rejected with [`AppError::Busy`] while one is.
#[derive(Debug)]
pub struct Session {
    state: Mutex<SessionState>,
    validator: ImageValidator,
    busy: AtomicBool,
    cancel: StdMutex<CancellationToken>,
}

/// Marks the session busy until dropped
#[derive(Debug)]
pub struct BusyGuard<'a> {
    busy: &'a AtomicBool,
    token: CancellationToken,
}

impl BusyGuard<'_> {
    /// Cancellation token of the run holding this guard
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl Session {
    pub fn new(validator: ImageValidator) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            validator,
            busy: AtomicBool::new(false),
            cancel: StdMutex::new(CancellationToken::new()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(ImageValidator::new(config.max_file_size_bytes))
    }

    /// Add files to the session.
    ///
    /// Files that are not images are skipped, never failing the call.
    pub async fn ingest<I>(&self, files: I) -> IngestReport
    where
        I: IntoIterator<Item = (String, Bytes)>,
    {
        let mut report = IngestReport::default();
        let mut state = self.state.lock().await;

        for (name, data) in files {
            match self.validator.accept(&name, &data) {
                Ok(content_type) => {
                    let id = state.items.insert(name.as_str(), content_type, data);
                    tracing::debug!(item = %id, name = %name, "Image loaded");
                    report.accepted.push(id);
                }
                Err(e) => {
                    let err = AppError::from(e);
                    tracing::debug!(name = %name, error = %err, "Skipping file");
                    report.skipped.push(name);
                }
            }
        }

        report
    }

    /// Remove one item and release its preview
    pub async fn remove(&self, id: ItemId) -> AppResult<Item> {
        let mut state = self.state.lock().await;
        self.ensure_idle()?;

        let item = state.items.remove(id).ok_or(AppError::NotFound(id))?;
        state.previews.release(id);
        tracing::debug!(item = %id, "Image removed");
        Ok(item)
    }

    /// Drop every item and preview
    pub async fn reset(&self) -> AppResult<()> {
        let mut state = self.state.lock().await;
        self.ensure_idle()?;

        state.items.clear();
        state.previews.release_all();
        tracing::info!("Session reset");
        Ok(())
    }

    /// Snapshot of the items in display order
    pub async fn items(&self) -> Vec<Item> {
        self.state.lock().await.items.iter().cloned().collect()
    }

    pub async fn get(&self, id: ItemId) -> Option<Item> {
        self.state.lock().await.items.get(id).cloned()
    }

    /// Identity of the item currently shown at `index`
    pub async fn id_at(&self, index: usize) -> Option<ItemId> {
        self.state.lock().await.items.at(index).map(Item::id)
    }

    pub async fn position(&self, id: ItemId) -> Option<usize> {
        self.state.lock().await.items.position(id)
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.items.is_empty()
    }

    pub async fn summary(&self) -> SizeSummary {
        SizeSummary::from_set(&self.state.lock().await.items)
    }

    /// Data URL of an item's processed output
    pub async fn preview(&self, id: ItemId) -> Option<String> {
        self.state.lock().await.previews.get(id).map(str::to_string)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Claim the session for a run; fails with `Busy` if one is in flight
    pub fn begin_run(&self) -> AppResult<BusyGuard<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(AppError::Busy);
        }

        let token = CancellationToken::new();
        *self.cancel.lock().unwrap_or_else(PoisonError::into_inner) = token.clone();
        Ok(BusyGuard {
            busy: &self.busy,
            token,
        })
    }

    /// Request cancellation of the run in flight.
    ///
    /// Returns false when no run is in flight.
    pub fn cancel(&self) -> bool {
        if !self.is_busy() {
            return false;
        }
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
        tracing::info!("Cancellation requested");
        true
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().await
    }

    fn ensure_idle(&self) -> AppResult<()> {
        if self.is_busy() {
            Err(AppError::Busy)
        } else {
            Ok(())
        }
    }
}
