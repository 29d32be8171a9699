//! Repository traits describing the host CMS seams.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::content::{ContentId, ContentItem};
use crate::domain::types::ContentStatus;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[async_trait]
pub trait ContentRepo: Send + Sync {
    async fn find_content(&self, id: &ContentId) -> Result<Option<ContentItem>, RepoError>;
    async fn find_by_path(&self, path: &str) -> Result<Option<ContentItem>, RepoError>;
    async fn set_status(&self, id: &ContentId, status: ContentStatus) -> Result<(), RepoError>;
}

/// Looks up the public, site-relative path of a content item.
#[async_trait]
pub trait UrlResolver: Send + Sync {
    async fn resolve_path(&self, id: &ContentId) -> Result<Option<String>, RepoError>;
}
