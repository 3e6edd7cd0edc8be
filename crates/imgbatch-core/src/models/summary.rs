use serde::Serialize;

use super::source_set::SourceSet;

/// Aggregate before/after sizes of a source set.
///
/// Items without a processed size contribute 0 to `total_processed`, so the
/// savings overstate the real reduction while some items are unprocessed.
/// `processed_count` makes that case visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SizeSummary {
    pub item_count: usize,
    pub processed_count: usize,
    pub total_original: u64,
    pub total_processed: u64,
}

impl SizeSummary {
    pub fn from_set(set: &SourceSet) -> Self {
        set.iter().fold(Self::default(), |mut acc, item| {
            acc.item_count += 1;
            acc.total_original += item.original_size();
            if let Some(size) = item.processed_size() {
                acc.processed_count += 1;
                acc.total_processed += size;
            }
            acc
        })
    }

    /// Bytes saved; negative when the outputs grew
    pub fn saved(&self) -> i64 {
        self.total_original as i64 - self.total_processed as i64
    }

    pub fn is_complete(&self) -> bool {
        self.processed_count == self.item_count
    }
}
