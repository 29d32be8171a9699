//! Shared domain enumerations.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Draft,
    Published,
    Unpublished,
    Trashed,
}

impl ContentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentStatus::Draft => "draft",
            ContentStatus::Published => "published",
            ContentStatus::Unpublished => "unpublished",
            ContentStatus::Trashed => "trashed",
        }
    }

    pub fn is_live(self) -> bool {
        matches!(self, ContentStatus::Published)
    }
}

/// Direction of a publish batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishAction {
    Publish,
    Unpublish,
}

impl PublishAction {
    pub fn as_str(self) -> &'static str {
        match self {
            PublishAction::Publish => "publish",
            PublishAction::Unpublish => "unpublish",
        }
    }

    /// Status a content item holds once the action completes.
    pub fn resulting_status(self) -> ContentStatus {
        match self {
            PublishAction::Publish => ContentStatus::Published,
            PublishAction::Unpublish => ContentStatus::Unpublished,
        }
    }
}
