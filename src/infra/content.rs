//! In-memory content store standing in for the host CMS.

use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use tracing::info;

use crate::application::repos::{ContentRepo, RepoError, UrlResolver};
use crate::domain::content::{
    ContentCacheFlags, ContentId, ContentItem, Property, normalize_path,
};
use crate::domain::types::ContentStatus;

use super::error::InfraError;

#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    items: DashMap<ContentId, ContentItem>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, item: ContentItem) {
        self.items.insert(item.id.clone(), item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn from_seed_str(data: &str) -> Result<Self, InfraError> {
        let seed: SeedFile = toml::from_str(data)
            .map_err(|err| InfraError::seed(format!("invalid content seed: {err}")))?;
        let store = Self::new();
        for entry in seed.content {
            store.insert(entry.into_item()?);
        }
        Ok(store)
    }

    pub async fn from_seed_file(path: &Path) -> Result<Self, InfraError> {
        let data = tokio::fs::read_to_string(path).await?;
        let store = Self::from_seed_str(&data)?;
        info!(
            target = "fastly_cms::infra::content",
            path = %path.display(),
            items = store.len(),
            "content seeded"
        );
        Ok(store)
    }
}

#[async_trait]
impl ContentRepo for InMemoryContentStore {
    async fn find_content(&self, id: &ContentId) -> Result<Option<ContentItem>, RepoError> {
        Ok(self.items.get(id).map(|entry| entry.value().clone()))
    }

    async fn find_by_path(&self, path: &str) -> Result<Option<ContentItem>, RepoError> {
        let wanted = normalize_path(path);
        let wanted = wanted.trim_end_matches('/');
        Ok(self
            .items
            .iter()
            .find(|entry| entry.value().path.trim_end_matches('/') == wanted)
            .map(|entry| entry.value().clone()))
    }

    async fn set_status(&self, id: &ContentId, status: ContentStatus) -> Result<(), RepoError> {
        let mut entry = self.items.get_mut(id).ok_or(RepoError::NotFound)?;
        entry.status = status;
        Ok(())
    }
}

#[async_trait]
impl UrlResolver for InMemoryContentStore {
    async fn resolve_path(&self, id: &ContentId) -> Result<Option<String>, RepoError> {
        Ok(self.items.get(id).map(|entry| entry.value().path.clone()))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SeedFile {
    content: Vec<SeedEntry>,
}

#[derive(Debug, Deserialize)]
struct SeedEntry {
    id: String,
    name: String,
    path: String,
    #[serde(default = "draft")]
    status: ContentStatus,
    #[serde(default)]
    do_not_cache: Option<SeedValue<bool>>,
    #[serde(default)]
    cache_for: Option<SeedValue<i64>>,
    #[serde(default)]
    body: String,
}

/// A property value, or an empty string for "present but not filled in".
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeedValue<T> {
    Set(T),
    Blank(String),
}

fn draft() -> ContentStatus {
    ContentStatus::Draft
}

impl SeedEntry {
    fn into_item(self) -> Result<ContentItem, InfraError> {
        let id = ContentId::parse(&self.id)
            .map_err(|err| InfraError::seed(format!("content `{}`: {err}", self.name)))?;
        let do_not_cache = property(self.do_not_cache, &id, "do_not_cache")?;
        let cache_for_seconds = property(self.cache_for, &id, "cache_for")?;

        Ok(ContentItem {
            path: normalize_path(&self.path),
            id,
            name: self.name,
            status: self.status,
            flags: ContentCacheFlags {
                do_not_cache,
                cache_for_seconds,
            },
            body: self.body,
        })
    }
}

fn property<T>(
    value: Option<SeedValue<T>>,
    id: &ContentId,
    field: &str,
) -> Result<Property<T>, InfraError> {
    match value {
        None => Ok(Property::Missing),
        Some(SeedValue::Set(value)) => Ok(Property::Value(value)),
        Some(SeedValue::Blank(text)) if text.trim().is_empty() => Ok(Property::Empty),
        Some(SeedValue::Blank(text)) => Err(InfraError::seed(format!(
            "content `{id}`: `{field}` has unexpected value `{text}`"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = r#"
[[content]]
id = "1051"
name = "Home"
path = "/"
status = "published"
do_not_cache = false
cache_for = 120
body = "Welcome"

[[content]]
id = "1052"
name = "Drafty"
path = "news/draft"
do_not_cache = ""
"#;

    fn id(raw: &str) -> ContentId {
        ContentId::parse(raw).expect("id")
    }

    #[tokio::test]
    async fn seed_maps_properties() {
        let store = InMemoryContentStore::from_seed_str(SEED).expect("seed");
        assert_eq!(store.len(), 2);

        let home = store.find_content(&id("1051")).await.expect("find").expect("home");
        assert_eq!(home.status, ContentStatus::Published);
        assert_eq!(home.flags.do_not_cache, Property::Value(false));
        assert_eq!(home.flags.cache_for_seconds, Property::Value(120));

        let draft = store.find_content(&id("1052")).await.expect("find").expect("draft");
        assert_eq!(draft.status, ContentStatus::Draft);
        assert_eq!(draft.path, "/news/draft");
        assert_eq!(draft.flags.do_not_cache, Property::Empty);
        assert_eq!(draft.flags.cache_for_seconds, Property::Missing);
    }

    #[test]
    fn seed_rejects_non_blank_strings() {
        let err = InMemoryContentStore::from_seed_str(
            "[[content]]\nid = \"1\"\nname = \"x\"\npath = \"/\"\ncache_for = \"soon\"\n",
        )
        .expect_err("invalid");
        assert!(matches!(err, InfraError::Seed { .. }));
    }

    #[tokio::test]
    async fn find_by_path_ignores_trailing_slash() {
        let store = InMemoryContentStore::from_seed_str(SEED).expect("seed");
        let found = store.find_by_path("/news/draft/").await.expect("find");
        assert_eq!(found.map(|item| item.id), Some(id("1052")));
    }

    #[tokio::test]
    async fn set_status_on_unknown_content_fails() {
        let store = InMemoryContentStore::new();
        let result = store.set_status(&id("9"), ContentStatus::Published).await;
        assert!(matches!(result, Err(RepoError::NotFound)));
    }

    #[tokio::test]
    async fn resolve_path_returns_stored_path() {
        let store = InMemoryContentStore::from_seed_str(SEED).expect("seed");
        assert_eq!(
            store.resolve_path(&id("1051")).await.expect("resolve").as_deref(),
            Some("/")
        );
        assert_eq!(store.resolve_path(&id("404")).await.expect("resolve"), None);
    }
}
