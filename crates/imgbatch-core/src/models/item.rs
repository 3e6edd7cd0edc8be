use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of an item within a session.
///
/// Assigned from a monotonic counter at ingestion and never reused, so removals
/// do not shift the identity of the remaining items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Output of a successful transform. The size is derived from the bytes, so
/// a processed size can never exist without processed bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedOutput {
    bytes: Bytes,
}

impl ProcessedOutput {
    pub fn new(bytes: Bytes) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    Loaded,
    Processing,
    Processed,
}

/// One user-supplied image plus its derived transform state
#[derive(Debug, Clone)]
pub struct Item {
    id: ItemId,
    name: String,
    content_type: String,
    raw_bytes: Bytes,
    original_size: u64,
    state: ItemState,
    processed: Option<ProcessedOutput>,
}

impl Item {
    pub(crate) fn new(id: ItemId, name: String, content_type: String, raw_bytes: Bytes) -> Self {
        let original_size = raw_bytes.len() as u64;
        Self {
            id,
            name,
            content_type,
            raw_bytes,
            original_size,
            state: ItemState::Loaded,
            processed: None,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn raw_bytes(&self) -> &Bytes {
        &self.raw_bytes
    }

    pub fn original_size(&self) -> u64 {
        self.original_size
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    pub fn processed(&self) -> Option<&ProcessedOutput> {
        self.processed.as_ref()
    }

    pub fn processed_size(&self) -> Option<u64> {
        self.processed.as_ref().map(ProcessedOutput::size)
    }

    pub fn mark_processing(&mut self) {
        self.state = ItemState::Processing;
    }

    /// Store a transform result, replacing any previous one.
    pub fn set_processed(&mut self, bytes: Bytes) {
        self.processed = Some(ProcessedOutput::new(bytes));
        self.state = ItemState::Processed;
    }

    /// Roll back a `Processing` mark after a failed transform.
    pub fn restore_state(&mut self) {
        self.state = if self.processed.is_some() {
            ItemState::Processed
        } else {
            ItemState::Loaded
        };
    }
}
