//! Content items as seen by the edge-cache integration.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::types::ContentStatus;

/// Opaque content identifier assigned by the host CMS.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Parse an identifier, trimming surrounding whitespace.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("content id must not be blank"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An authoring property on a document type.
///
/// The host distinguishes a property that does not exist on the document type
/// from one that exists but was never filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Property<T> {
    #[default]
    Missing,
    Empty,
    Value(T),
}

impl<T: Copy> Property<T> {
    pub fn value(&self) -> Option<T> {
        match self {
            Property::Value(value) => Some(*value),
            Property::Missing | Property::Empty => None,
        }
    }
}

impl<T> From<Option<T>> for Property<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Property::Value(value),
            None => Property::Missing,
        }
    }
}

/// Editor-owned cache overrides; read-only to the integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContentCacheFlags {
    pub do_not_cache: Property<bool>,
    pub cache_for_seconds: Property<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub id: ContentId,
    pub name: String,
    /// Site-relative path, always starting with `/`.
    pub path: String,
    pub status: ContentStatus,
    pub flags: ContentCacheFlags,
    pub body: String,
}

impl ContentItem {
    pub fn is_published(&self) -> bool {
        self.status.is_live()
    }

    /// Snapshot of this item as it will look once `status` applies.
    pub fn with_status(&self, status: ContentStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

/// Normalise a site-relative path so it always starts with a single `/`.
pub fn normalize_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('/');
    format!("/{trimmed}")
}
