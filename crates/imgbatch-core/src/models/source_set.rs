use bytes::Bytes;

use super::item::{Item, ItemId};

/// Insertion-ordered collection of loaded items.
///
/// Lookups are keyed by [`ItemId`]; the positional index of an item is only a
/// display concern and is renumbered whenever an earlier item is removed.
#[derive(Debug, Default)]
pub struct SourceSet {
    items: Vec<Item>,
    next_id: u64,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new item at the end of the set and return its identity
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        content_type: impl Into<String>,
        raw_bytes: Bytes,
    ) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        self.items
            .push(Item::new(id, name.into(), content_type.into(), raw_bytes));
        id
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.iter_mut().find(|item| item.id() == id)
    }

    /// Current display position of an item
    pub fn position(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    /// Item at a display position
    pub fn at(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn remove(&mut self, id: ItemId) -> Option<Item> {
        let index = self.position(id)?;
        Some(self.items.remove(index))
    }

    /// Drop every item. Identities are not reused after a clear.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(Item::id).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_original_size(&self) -> u64 {
        self.items.iter().map(Item::original_size).sum()
    }
}
