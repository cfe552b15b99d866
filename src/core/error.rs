use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeedError {
    #[error("Failed to load media {uri}: {reason}")]
    MediaLoad { uri: String, reason: String },

    #[error("Failed to fetch next batch after item {cursor}: {reason}")]
    BatchFetch { cursor: usize, reason: String },

    #[error("Comment is empty")]
    EmptyComment,

    #[error("Feed event queue is closed")]
    QueueClosed,
}
