use std::ops::Range;
use std::sync::Arc;

use crate::core::{ItemKey, MediaItem};

/// Ordered, append-only sequence of feed descriptors.
///
/// Readers take an `Arc` snapshot; an append builds the next sequence and
/// swaps it in whole, so a snapshot never contains part of a batch.
#[derive(Debug, Clone, Default)]
pub struct DescriptorStore {
    items: Arc<Vec<MediaItem>>,
}

impl DescriptorStore {
    pub fn new(items: Vec<MediaItem>) -> Self {
        Self {
            items: Arc::new(items),
        }
    }

    pub fn snapshot(&self) -> Arc<Vec<MediaItem>> {
        Arc::clone(&self.items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MediaItem> {
        self.items.get(index)
    }

    pub fn key_at(&self, index: usize) -> Option<ItemKey> {
        self.items.get(index).map(|item| ItemKey::new(index, item.id.clone()))
    }

    /// Appends a whole batch and returns the indices it occupies.
    pub fn append(&mut self, batch: Vec<MediaItem>) -> Range<usize> {
        let start = self.items.len();
        if batch.is_empty() {
            return start..start;
        }

        let mut next = Vec::with_capacity(start + batch.len());
        next.extend(self.items.iter().cloned());
        next.extend(batch);
        self.items = Arc::new(next);

        log::debug!("Descriptor store grew from {} to {} items", start, self.items.len());
        start..self.items.len()
    }
}
