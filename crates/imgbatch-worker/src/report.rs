use imgbatch_core::{EngineMode, ItemId, SizeSummary};
use serde::Serialize;

/// An item that failed within an otherwise successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub id: ItemId,
    pub name: String,
    pub error: String,
}

/// Outcome of one batch run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: EngineMode,
    pub processed: Vec<ItemId>,
    pub failed: Vec<ItemFailure>,
    /// Summary of the whole session after the run
    pub summary: SizeSummary,
}

impl RunReport {
    pub fn new(mode: EngineMode) -> Self {
        Self {
            mode,
            processed: Vec::new(),
            failed: Vec::new(),
            summary: SizeSummary::default(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}
