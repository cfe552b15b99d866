use async_trait::async_trait;
use std::ops::Range;

use crate::core::{DescriptorStore, FeedError, MediaItem};

/// Where the next batch of descriptors comes from.
#[async_trait]
pub trait ContentSource: Send + Sync + 'static {
    /// `after_cursor` is the number of items already loaded.
    async fn fetch_next_batch(&self, after_cursor: usize) -> Result<Vec<MediaItem>, FeedError>;
}

/// Serves the same batch on every request, so the feed never runs dry.
#[derive(Debug, Clone)]
pub struct FixedBatchSource {
    batch: Vec<MediaItem>,
}

impl FixedBatchSource {
    pub fn new(batch: Vec<MediaItem>) -> Self {
        Self { batch }
    }

    pub fn demo() -> Self {
        Self::new(MediaItem::demo_batch())
    }
}

#[async_trait]
impl ContentSource for FixedBatchSource {
    async fn fetch_next_batch(&self, after_cursor: usize) -> Result<Vec<MediaItem>, FeedError> {
        log::debug!("Serving fixed batch of {} after {}", self.batch.len(), after_cursor);
        Ok(self.batch.clone())
    }
}

/// Decides when to ask for more items and applies the answer.
#[derive(Debug, Clone)]
pub struct PaginationController {
    threshold: usize,
    in_flight: bool,
    requested_at_len: Option<usize>,
    batches_appended: u64,
}

impl PaginationController {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            in_flight: false,
            requested_at_len: None,
            batches_appended: 0,
        }
    }

    /// Returns the cursor to fetch after when `focused_index` is within the
    /// threshold of the end. Fires once per loaded length, and never while a
    /// request is outstanding.
    pub fn poll(&mut self, focused_index: usize, loaded_len: usize) -> Option<usize> {
        if self.in_flight {
            return None;
        }

        let remaining = loaded_len.saturating_sub(focused_index + 1);
        if remaining > self.threshold || self.requested_at_len == Some(loaded_len) {
            return None;
        }

        log::info!(
            "End of feed within {} items (focused {}, loaded {}), requesting next batch",
            remaining,
            focused_index,
            loaded_len
        );
        self.in_flight = true;
        self.requested_at_len = Some(loaded_len);
        Some(loaded_len)
    }

    /// Appends a fetched batch in one step. A failed fetch leaves the store as
    /// it was and allows the next poll to retry.
    pub fn complete(
        &mut self,
        result: Result<Vec<MediaItem>, FeedError>,
        store: &mut DescriptorStore,
    ) -> Result<Range<usize>, FeedError> {
        self.in_flight = false;

        match result {
            Ok(batch) => {
                let range = store.append(batch);
                if !range.is_empty() {
                    self.batches_appended += 1;
                }
                log::info!("Appended {} items, feed now {} long", range.len(), store.len());
                Ok(range)
            }
            Err(e) => {
                log::error!("Failed to fetch next batch: {}", e);
                self.requested_at_len = None;
                Err(e)
            }
        }
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn batches_appended(&self) -> u64 {
        self.batches_appended
    }
}
