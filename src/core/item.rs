use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use crate::core::FeedError;

/// A single entry of the feed. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    #[serde(alias = "video")]
    pub source_uri: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
}

/// Position of an item in the rendered sequence plus its descriptor id.
///
/// Pagination re-appends the same descriptors, so the id alone does not
/// identify a rendered row. The index does, and it never shifts because the
/// sequence is append-only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    pub index: usize,
    pub id: String,
}

impl ItemKey {
    pub fn new(index: usize, id: impl Into<String>) -> Self {
        Self {
            index,
            id: id.into(),
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.id, self.index)
    }
}

impl MediaItem {
    pub fn new(id: impl Into<String>, source_uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_uri: source_uri.into(),
            caption: String::new(),
            tags: BTreeSet::new(),
            comments: Vec::new(),
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_comment(mut self, id: impl Into<String>, text: impl Into<String>) -> Self {
        self.comments.push(Comment {
            id: id.into(),
            text: text.into(),
            posted_at: None,
        });
        self
    }

    /// Reads a batch of descriptors from a JSON array.
    pub fn load_batch(path: &Path) -> anyhow::Result<Vec<MediaItem>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read feed file {}: {}", path.display(), e))?;
        let items: Vec<MediaItem> = serde_json::from_str(&content)?;
        log::info!("Loaded {} feed items from {}", items.len(), path.display());
        Ok(items)
    }

    /// The five posts the feed screen ships with.
    pub fn demo_batch() -> Vec<MediaItem> {
        vec![
            MediaItem::new(
                "2",
                "https://videos.pexels.com/video-files/855029/855029-hd_1920_1080_30fps.mp4",
            )
            .with_caption("Caption of the post")
            .with_tags(["hello", "greeting"])
            .with_comment("c1", "Hello!"),
            MediaItem::new(
                "1",
                "https://videos.pexels.com/video-files/6853337/6853337-uhd_1440_2732_25fps.mp4",
            )
            .with_caption("Hey there")
            .with_tags(["fun", "dance"])
            .with_comment("c1", "Great video!")
            .with_comment("c2", "Love this!"),
            MediaItem::new(
                "3",
                "https://notjustdev-dummy.s3.us-east-2.amazonaws.com/vertical-videos/3.mp4",
            )
            .with_caption("Hola")
            .with_tags(["greetings"]),
            MediaItem::new(
                "4",
                "https://notjustdev-dummy.s3.us-east-2.amazonaws.com/vertical-videos/4.mp4",
            )
            .with_caption("Piano practice")
            .with_tags(["music"]),
            MediaItem::new(
                "5",
                "https://notjustdev-dummy.s3.us-east-2.amazonaws.com/vertical-videos/5.mp4",
            )
            .with_caption("Hello World!")
            .with_tags(["intro"]),
        ]
    }
}

/// Text typed into the comment box of an item overlay.
#[derive(Debug, Clone, Default)]
pub struct CommentDraft {
    pub text: String,
}

impl CommentDraft {
    /// Turns the draft into a comment and clears it. Whitespace-only drafts
    /// are rejected and left untouched.
    pub fn submit(&mut self) -> Result<Comment, FeedError> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            return Err(FeedError::EmptyComment);
        }

        let comment = Comment {
            id: uuid::Uuid::new_v4().to_string(),
            text: trimmed.to_string(),
            posted_at: Some(Utc::now()),
        };
        self.text.clear();
        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_batch_shape() {
        let batch = MediaItem::demo_batch();
        assert_eq!(batch.len(), 5);
        assert_eq!(batch[0].id, "2");
        assert_eq!(batch[1].comments.len(), 2);
        assert!(batch[0].tags.contains("greeting"));
    }

    #[test]
    fn test_item_key_display_matches_list_key() {
        let key = ItemKey::new(7, "3");
        assert_eq!(key.to_string(), "3-7");
    }

    #[test]
    fn test_item_deserializes_video_field_alias() {
        let json = r#"{
            "id": "9",
            "video": "https://example.com/9.mp4",
            "caption": "Hi",
            "tags": ["a", "b", "a"],
            "comments": [{ "id": "c1", "text": "nice" }]
        }"#;

        let item: MediaItem = serde_json::from_str(json).expect("Failed to parse item");
        assert_eq!(item.source_uri, "https://example.com/9.mp4");
        assert_eq!(item.tags.len(), 2);
        assert!(item.comments[0].posted_at.is_none());
    }

    #[test]
    fn test_comment_draft_submit() {
        let mut draft = CommentDraft {
            text: "  great clip \n".to_string(),
        };

        let comment = draft.submit().expect("draft should be accepted");
        assert_eq!(comment.text, "great clip");
        assert!(comment.posted_at.is_some());
        assert!(draft.text.is_empty());
    }

    #[test]
    fn test_empty_comment_draft_is_rejected() {
        let mut draft = CommentDraft {
            text: "   ".to_string(),
        };

        assert_eq!(draft.submit(), Err(FeedError::EmptyComment));
        assert_eq!(draft.text, "   ");
    }
}
