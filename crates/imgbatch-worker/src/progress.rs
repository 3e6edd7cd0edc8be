//! Batch progress events

use imgbatch_core::{EngineMode, ItemId};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::report::RunReport;

/// Event emitted while a batch runs
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BatchEvent {
    Started { total: usize, mode: EngineMode },
    /// Overall progress of the run, never decreasing
    Progress { percent: u8 },
    ItemCompleted { id: ItemId, size: u64 },
    ItemFailed { id: ItemId, error: String },
    /// The run stopped before completion and no further results were applied
    Aborted { error: String },
    Finished { report: RunReport },
}

/// Receiver of batch events
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: BatchEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(BatchEvent) + Send + Sync,
{
    fn emit(&self, event: BatchEvent) {
        self(event)
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: BatchEvent) {}
}

/// Forwards events to an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<BatchEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: BatchEvent) {
        // A dropped receiver only means nobody is watching
        if self.tx.send(event).is_err() {
            tracing::trace!("Progress receiver dropped");
        }
    }
}

/// Maps per-call progress onto an overall percentage.
///
/// `overall = round((completed + fraction / 100) / units * 100)`, clamped so
/// that it never goes backwards.
#[derive(Debug, Clone)]
pub struct OverallProgress {
    units: usize,
    completed: usize,
    last: u8,
}

impl OverallProgress {
    pub fn new(units: usize) -> Self {
        Self {
            units,
            completed: 0,
            last: 0,
        }
    }

    pub fn percent(&self) -> u8 {
        self.last
    }

    /// Record progress of the current unit; returns the new overall value if it grew
    pub fn update(&mut self, fraction: u8) -> Option<u8> {
        if self.units == 0 {
            return self.advance_to(100);
        }
        let fraction = f64::from(fraction.min(100)) / 100.0;
        let overall = ((self.completed as f64 + fraction) / self.units as f64 * 100.0).round();
        self.advance_to(overall.min(100.0) as u8)
    }

    /// Mark the current unit finished; returns the new overall value if it grew
    pub fn complete_unit(&mut self) -> Option<u8> {
        self.completed = (self.completed + 1).min(self.units);
        self.update(0)
    }

    fn advance_to(&mut self, percent: u8) -> Option<u8> {
        if percent > self.last {
            self.last = percent;
            Some(percent)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_sequential_progress() {
        let mut progress = OverallProgress::new(3);
        assert_eq!(progress.update(50), Some(17));
        assert_eq!(progress.update(100), Some(33));
        assert_eq!(progress.complete_unit(), None);
        assert_eq!(progress.update(100), Some(67));
        assert_eq!(progress.complete_unit(), None);
        assert_eq!(progress.update(40), Some(80));
        assert_eq!(progress.update(100), Some(100));
        assert_eq!(progress.complete_unit(), None);
        assert_eq!(progress.percent(), 100);
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut progress = OverallProgress::new(2);
        assert_eq!(progress.update(80), Some(40));
        assert_eq!(progress.update(20), None);
        assert_eq!(progress.percent(), 40);
    }

    #[test]
    fn test_failed_unit_still_advances() {
        let mut progress = OverallProgress::new(2);
        assert_eq!(progress.complete_unit(), Some(50));
        assert_eq!(progress.complete_unit(), Some(100));
        // Extra completions are ignored
        assert_eq!(progress.complete_unit(), None);
    }

    #[test]
    fn test_empty_run_is_complete() {
        let mut progress = OverallProgress::new(0);
        assert_eq!(progress.update(0), Some(100));
    }

    #[test]
    fn test_closure_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |event: BatchEvent| {
            if let BatchEvent::Progress { percent } = event {
                seen.lock().unwrap().push(percent);
            }
        };
        sink.emit(BatchEvent::Progress { percent: 10 });
        sink.emit(BatchEvent::Aborted {
            error: "boom".to_string(),
        });
        NullSink.emit(BatchEvent::Progress { percent: 20 });
        assert_eq!(*seen.lock().unwrap(), vec![10]);
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (sink, mut rx) = ChannelSink::new();
        sink.emit(BatchEvent::Progress { percent: 5 });
        drop(sink);
        assert!(matches!(rx.recv().await, Some(BatchEvent::Progress { percent: 5 })));
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(BatchEvent::ItemCompleted {
            id: ItemId(3),
            size: 42,
        })
        .unwrap();
        assert_eq!(json["type"], "itemCompleted");
        assert_eq!(json["id"], 3);
        assert_eq!(json["size"], 42);
    }
}
