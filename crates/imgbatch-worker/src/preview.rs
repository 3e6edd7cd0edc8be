//! Previews of processed outputs

use imgbatch_core::{DataUrl, ItemId};
use std::collections::HashMap;

/// Data URLs of processed outputs, keyed by item.
///
/// An entry must be released when its item is removed or the session is
/// reset, otherwise previews accumulate for the lifetime of the session.
#[derive(Debug, Default)]
pub struct PreviewCache {
    entries: HashMap<ItemId, String>,
}

impl PreviewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) the preview of an item
    pub fn store(&mut self, id: ItemId, content_type: &str, bytes: &[u8]) {
        if self
            .entries
            .insert(id, DataUrl::encode(content_type, bytes))
            .is_some()
        {
            tracing::trace!(item = %id, "Replaced preview");
        }
    }

    pub fn get(&self, id: ItemId) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }

    pub fn release(&mut self, id: ItemId) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn release_all(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
