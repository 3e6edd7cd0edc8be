//! Batch coordination

use imgbatch_core::{
    AppError, AppResult, Dispatch, ItemId, LogLevel, TransformConfig, TransformEngine,
    TransformInput, TransformOutput,
};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

use crate::progress::{BatchEvent, OverallProgress, ProgressSink};
use crate::report::{ItemFailure, RunReport};
use crate::session::Session;

/// Runs batches of a session through a transform engine.
///
/// Per-item engines are driven strictly sequentially so overall progress can
/// be derived from the number of completed items. Whole-batch engines get a
/// single call and either all results are applied or none.
pub struct BatchCoordinator {
    session: Arc<Session>,
    sink: Arc<dyn ProgressSink>,
}

impl BatchCoordinator {
    pub fn new(session: Arc<Session>, sink: Arc<dyn ProgressSink>) -> Self {
        Self { session, sink }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Transform every item of the session
    pub async fn process_all(
        &self,
        engine: &dyn TransformEngine,
        config: &TransformConfig,
    ) -> AppResult<RunReport> {
        self.run(None, engine, config).await
    }

    /// Transform a single item
    pub async fn process_one(
        &self,
        id: ItemId,
        engine: &dyn TransformEngine,
        config: &TransformConfig,
    ) -> AppResult<RunReport> {
        self.run(Some(id), engine, config).await
    }

    async fn run(
        &self,
        only: Option<ItemId>,
        engine: &dyn TransformEngine,
        config: &TransformConfig,
    ) -> AppResult<RunReport> {
        let guard = self.session.begin_run()?;
        let token = guard.token().clone();
        let inputs = self.prepare(only).await?;
        let mode = engine.mode();

        tracing::info!(
            mode = %mode,
            items = inputs.len(),
            width = ?config.target_width,
            height = ?config.target_height,
            quality = config.quality,
            "Batch started"
        );
        self.sink.emit(BatchEvent::Started {
            total: inputs.len(),
            mode,
        });
        self.sink.emit(BatchEvent::Progress { percent: 0 });

        let mut report = RunReport::new(mode);
        let outcome = match engine.dispatch() {
            Dispatch::PerItem => {
                self.run_per_item(&inputs, engine, config, &token, &mut report)
                    .await
            }
            Dispatch::WholeBatch => {
                self.run_whole_batch(&inputs, engine, config, &token, &mut report)
                    .await
            }
        };

        if let Err(e) = outcome {
            self.restore(&inputs).await;
            match e.log_level() {
                LogLevel::Error => tracing::error!(error = %e, "Batch aborted"),
                _ => tracing::warn!(error = %e, "Batch aborted"),
            }
            self.sink.emit(BatchEvent::Aborted {
                error: e.to_string(),
            });
            return Err(e);
        }

        report.summary = self.session.summary().await;
        tracing::info!(
            processed = report.processed.len(),
            failed = report.failed.len(),
            saved = report.summary.saved(),
            "Batch finished"
        );
        self.sink.emit(BatchEvent::Finished {
            report: report.clone(),
        });

        drop(guard);
        Ok(report)
    }

    /// Snapshot the targeted items and mark them as processing
    async fn prepare(&self, only: Option<ItemId>) -> AppResult<Vec<TransformInput>> {
        let mut state = self.session.lock().await;

        let ids = match only {
            Some(id) if state.items.get(id).is_none() => return Err(AppError::NotFound(id)),
            Some(id) => vec![id],
            None => state.items.ids(),
        };

        let mut inputs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(item) = state.items.get_mut(id) {
                item.mark_processing();
                inputs.push(TransformInput {
                    id,
                    name: item.name().to_string(),
                    content_type: item.content_type().to_string(),
                    bytes: item.raw_bytes().clone(),
                });
            }
        }
        Ok(inputs)
    }

    async fn run_per_item(
        &self,
        inputs: &[TransformInput],
        engine: &dyn TransformEngine,
        config: &TransformConfig,
        token: &CancellationToken,
        report: &mut RunReport,
    ) -> AppResult<()> {
        let tracker = Mutex::new(OverallProgress::new(inputs.len()));
        let sink = Arc::clone(&self.sink);
        let on_item_progress = |fraction: u8| {
            let grew = tracker
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .update(fraction);
            if let Some(percent) = grew {
                sink.emit(BatchEvent::Progress { percent });
            }
        };

        if inputs.is_empty() {
            on_item_progress(100);
            return Ok(());
        }

        for (index, input) in inputs.iter().enumerate() {
            if token.is_cancelled() {
                // Items already written keep their results
                self.restore(&inputs[index..]).await;
                return Err(AppError::Cancelled);
            }

            let result = engine
                .transform(std::slice::from_ref(input), config, &on_item_progress)
                .await;

            match result.and_then(|outputs| single_output(input, outputs)) {
                Ok(output) => {
                    self.apply(&[output], report).await;
                }
                Err(e) if e.is_batch_level() => {
                    self.restore(&inputs[index..]).await;
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        item = %input.id,
                        name = %input.name,
                        error = %e,
                        "Item failed"
                    );
                    self.restore(std::slice::from_ref(input)).await;
                    self.sink.emit(BatchEvent::ItemFailed {
                        id: input.id,
                        error: e.to_string(),
                    });
                    report.failed.push(ItemFailure {
                        id: input.id,
                        name: input.name.clone(),
                        error: e.to_string(),
                    });
                }
            }

            let grew = tracker
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .complete_unit();
            if let Some(percent) = grew {
                self.sink.emit(BatchEvent::Progress { percent });
            }
        }

        Ok(())
    }

    async fn run_whole_batch(
        &self,
        inputs: &[TransformInput],
        engine: &dyn TransformEngine,
        config: &TransformConfig,
        token: &CancellationToken,
        report: &mut RunReport,
    ) -> AppResult<()> {
        let tracker = Mutex::new(OverallProgress::new(1));
        let sink = Arc::clone(&self.sink);
        let on_batch_progress = |fraction: u8| {
            let grew = tracker
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .update(fraction);
            if let Some(percent) = grew {
                sink.emit(BatchEvent::Progress { percent });
            }
        };

        if inputs.is_empty() {
            on_batch_progress(100);
            return Ok(());
        }

        let outputs = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(AppError::Cancelled),
            result = engine.transform(inputs, config, &on_batch_progress) => result?,
        };

        if outputs.len() != inputs.len() {
            return Err(AppError::MalformedResponse(format!(
                "expected {} results, got {}",
                inputs.len(),
                outputs.len()
            )));
        }

        self.apply(&outputs, report).await;
        on_batch_progress(100);
        Ok(())
    }

    /// Write results back onto their items by id
    async fn apply(&self, outputs: &[TransformOutput], report: &mut RunReport) {
        let mut state = self.session.lock().await;

        for output in outputs {
            let Some(item) = state.items.get_mut(output.id) else {
                tracing::warn!(item = %output.id, "Result for an item no longer in the session");
                continue;
            };
            item.set_processed(output.bytes.clone());
            tracing::debug!(
                item = %output.id,
                original = item.original_size(),
                processed = output.size(),
                "Result applied"
            );

            state
                .previews
                .store(output.id, &output.content_type, &output.bytes);
            report.processed.push(output.id);
            self.sink.emit(BatchEvent::ItemCompleted {
                id: output.id,
                size: output.size(),
            });
        }
    }

    async fn restore(&self, inputs: &[TransformInput]) {
        let mut state = self.session.lock().await;
        for input in inputs {
            if let Some(item) = state.items.get_mut(input.id) {
                item.restore_state();
            }
        }
    }
}

fn single_output(
    input: &TransformInput,
    outputs: Vec<TransformOutput>,
) -> AppResult<TransformOutput> {
    outputs
        .into_iter()
        .find(|output| output.id == input.id)
        .ok_or_else(|| AppError::Internal(format!("No result returned for {}", input.name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use imgbatch_core::{EngineMode, ItemProgress, ItemState, Preset};
    use imgbatch_processing::{ImageValidator, LocalTransformEngine};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Engine that echoes the input reversed, failing on names containing "bad"
    struct FakeEngine {
        dispatch: Dispatch,
        calls: AtomicUsize,
        fail_batch: bool,
    }

    impl FakeEngine {
        fn new(dispatch: Dispatch) -> Self {
            Self {
                dispatch,
                calls: AtomicUsize::new(0),
                fail_batch: false,
            }
        }
    }

    #[async_trait]
    impl TransformEngine for FakeEngine {
        fn mode(&self) -> EngineMode {
            match self.dispatch {
                Dispatch::PerItem => EngineMode::Local,
                Dispatch::WholeBatch => EngineMode::Remote,
            }
        }

        fn dispatch(&self) -> Dispatch {
            self.dispatch
        }

        async fn transform(
            &self,
            inputs: &[TransformInput],
            _config: &TransformConfig,
            progress: &dyn ItemProgress,
        ) -> AppResult<Vec<TransformOutput>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            progress.report(0);
            if self.fail_batch {
                return Err(AppError::Transport("connection refused".to_string()));
            }
            let mut outputs = Vec::new();
            for input in inputs {
                if input.name.contains("bad") {
                    return Err(AppError::decode(&input.name, "corrupt"));
                }
                progress.report(50);
                let half = input.bytes.len() / 2;
                outputs.push(TransformOutput {
                    id: input.id,
                    content_type: "image/jpeg".to_string(),
                    bytes: input.bytes.slice(..half),
                });
            }
            progress.report(100);
            Ok(outputs)
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<BatchEvent>>>, Arc<dyn ProgressSink>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&events);
        let sink: Arc<dyn ProgressSink> =
            Arc::new(move |event: BatchEvent| captured.lock().unwrap().push(event));
        (events, sink)
    }

    fn percents(events: &[BatchEvent]) -> Vec<u8> {
        events
            .iter()
            .filter_map(|event| match event {
                BatchEvent::Progress { percent } => Some(*percent),
                _ => None,
            })
            .collect()
    }

    async fn session_with(names: &[&str]) -> Arc<Session> {
        let session = Arc::new(Session::new(ImageValidator::new(1024 * 1024)));
        session
            .ingest(
                names
                    .iter()
                    .map(|name| (name.to_string(), Bytes::from(vec![7u8; 100]))),
            )
            .await;
        session
    }

    fn config() -> TransformConfig {
        TransformConfig::resolve(Preset::Square, 80)
    }

    #[tokio::test]
    async fn test_per_item_progress_is_sequential() {
        let session = session_with(&["a.png", "b.png", "c.png"]).await;
        let (events, sink) = recorder();
        let coordinator = BatchCoordinator::new(Arc::clone(&session), sink);
        let engine = FakeEngine::new(Dispatch::PerItem);

        let report = coordinator.process_all(&engine, &config()).await.unwrap();

        assert_eq!(engine.calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.processed, vec![ItemId(0), ItemId(1), ItemId(2)]);
        assert!(report.is_success());
        assert_eq!(report.summary.total_original, 300);
        assert_eq!(report.summary.total_processed, 150);

        let events = events.lock().unwrap();
        assert_eq!(percents(&events), vec![0, 17, 33, 50, 67, 83, 100]);
        assert!(matches!(events.first(), Some(BatchEvent::Started { total: 3, .. })));
        assert!(matches!(events.last(), Some(BatchEvent::Finished { .. })));
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_item_failure_does_not_abort_siblings() {
        let session = session_with(&["a.png", "bad.png", "c.png"]).await;
        let (events, sink) = recorder();
        let coordinator = BatchCoordinator::new(Arc::clone(&session), sink);
        let engine = FakeEngine::new(Dispatch::PerItem);

        let report = coordinator.process_all(&engine, &config()).await.unwrap();

        assert_eq!(report.processed, vec![ItemId(0), ItemId(2)]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].id, ItemId(1));
        assert_eq!(report.failed[0].name, "bad.png");

        let failed = session.get(ItemId(1)).await.unwrap();
        assert_eq!(failed.state(), ItemState::Loaded);
        assert!(failed.processed().is_none());
        assert_eq!(session.get(ItemId(2)).await.unwrap().processed_size(), Some(50));

        let events = events.lock().unwrap();
        assert_eq!(percents(&events).last(), Some(&100));
        assert!(events
            .iter()
            .any(|e| matches!(e, BatchEvent::ItemFailed { id, .. } if *id == ItemId(1))));
    }

    #[tokio::test]
    async fn test_whole_batch_progress_jumps() {
        let session = session_with(&["a.png", "b.png"]).await;
        let (events, sink) = recorder();
        let coordinator = BatchCoordinator::new(Arc::clone(&session), sink);
        let engine = FakeEngine::new(Dispatch::WholeBatch);

        let report = coordinator.process_all(&engine, &config()).await.unwrap();

        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.mode, EngineMode::Remote);
        assert_eq!(report.processed.len(), 2);
        // The fake reports 50 mid-call; a real remote engine only reports 0 and 100
        assert_eq!(percents(&events.lock().unwrap()), vec![0, 50, 100]);
        assert!(session.preview(ItemId(0)).await.is_some());
    }

    #[tokio::test]
    async fn test_whole_batch_failure_applies_nothing() {
        let session = session_with(&["a.png", "b.png"]).await;
        let (events, sink) = recorder();
        let coordinator = BatchCoordinator::new(Arc::clone(&session), sink);
        let mut engine = FakeEngine::new(Dispatch::WholeBatch);
        engine.fail_batch = true;

        let err = coordinator.process_all(&engine, &config()).await.unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));

        for item in session.items().await {
            assert_eq!(item.state(), ItemState::Loaded);
            assert!(item.processed().is_none());
        }
        assert!(matches!(
            events.lock().unwrap().last(),
            Some(BatchEvent::Aborted { .. })
        ));
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_process_one_reports_zero_then_hundred() {
        let session = session_with(&["a.png", "b.png"]).await;
        let (events, sink) = recorder();
        let coordinator = BatchCoordinator::new(Arc::clone(&session), sink);
        let engine = FakeEngine::new(Dispatch::PerItem);

        let report = coordinator
            .process_one(ItemId(1), &engine, &config())
            .await
            .unwrap();

        assert_eq!(report.processed, vec![ItemId(1)]);
        assert!(session.get(ItemId(0)).await.unwrap().processed().is_none());
        let percents = percents(&events.lock().unwrap());
        assert_eq!(percents.first(), Some(&0));
        assert_eq!(percents.last(), Some(&100));

        let err = coordinator
            .process_one(ItemId(9), &engine, &config())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(ItemId(9))));
    }

    #[tokio::test]
    async fn test_remove_and_reset_release_previews() {
        let session = session_with(&["a.png", "b.png", "c.png"]).await;
        let coordinator = BatchCoordinator::new(Arc::clone(&session), Arc::new(crate::NullSink));
        let engine = FakeEngine::new(Dispatch::PerItem);

        coordinator
            .process_one(ItemId(0), &engine, &config())
            .await
            .unwrap();
        let preview = session.preview(ItemId(0)).await.unwrap();
        assert!(preview.starts_with("data:image/jpeg;base64,"));
        assert!(session.preview(ItemId(1)).await.is_none());

        session.remove(ItemId(0)).await.unwrap();
        assert!(session.preview(ItemId(0)).await.is_none());
        assert_eq!(session.lock().await.previews.len(), 0);

        coordinator.process_all(&engine, &config()).await.unwrap();
        assert!(session.preview(ItemId(1)).await.is_some());
        assert!(session.preview(ItemId(2)).await.is_some());

        session.reset().await.unwrap();
        assert!(session.preview(ItemId(1)).await.is_none());
        assert!(session.preview(ItemId(2)).await.is_none());
        assert!(session.lock().await.previews.is_empty());
    }

    #[tokio::test]
    async fn test_rerun_overwrites_result() {
        let session = session_with(&["a.png"]).await;
        let coordinator = BatchCoordinator::new(Arc::clone(&session), Arc::new(crate::NullSink));
        let engine = FakeEngine::new(Dispatch::PerItem);

        coordinator.process_all(&engine, &config()).await.unwrap();
        coordinator.process_all(&engine, &config()).await.unwrap();

        let item = session.get(ItemId(0)).await.unwrap();
        assert_eq!(item.state(), ItemState::Processed);
        assert_eq!(item.processed_size(), Some(50));
        assert_eq!(item.original_size(), 100);
    }

    #[tokio::test]
    async fn test_concurrent_run_is_rejected() {
        let session = session_with(&["a.png"]).await;
        let coordinator = BatchCoordinator::new(Arc::clone(&session), Arc::new(crate::NullSink));
        let engine = FakeEngine::new(Dispatch::PerItem);

        let _guard = session.begin_run().unwrap();
        let err = coordinator.process_all(&engine, &config()).await.unwrap_err();
        assert!(matches!(err, AppError::Busy));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_between_items_keeps_applied_results() {
        let session = session_with(&["a.png", "b.png", "c.png"]).await;
        let cancel_from = Arc::clone(&session);
        // Cancel as soon as the first item completes
        let sink: Arc<dyn ProgressSink> = Arc::new(move |event: BatchEvent| {
            if matches!(event, BatchEvent::ItemCompleted { .. }) {
                cancel_from.cancel();
            }
        });
        let coordinator = BatchCoordinator::new(Arc::clone(&session), sink);
        let engine = FakeEngine::new(Dispatch::PerItem);

        let err = coordinator.process_all(&engine, &config()).await.unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);

        let items = session.items().await;
        assert_eq!(items[0].state(), ItemState::Processed);
        assert_eq!(items[1].state(), ItemState::Loaded);
        assert_eq!(items[2].state(), ItemState::Loaded);
    }

    #[tokio::test]
    async fn test_local_engine_decode_error_is_per_item() {
        let session = session_with(&["broken.png"]).await;
        let coordinator = BatchCoordinator::new(Arc::clone(&session), Arc::new(crate::NullSink));

        let report = coordinator
            .process_all(&LocalTransformEngine::new(), &config())
            .await
            .unwrap();

        assert!(report.processed.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].error.contains("broken.png"));
    }
}
