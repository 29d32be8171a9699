//! Entry points a host wires to its own publish and response events.

use axum::http::HeaderMap;
use tracing::info;

use super::collector::{DispatchedPurges, PublishCollector, StagedPurges};
use super::keys;
use super::policy::{CachePolicyDecision, CachePolicyWriter};
use super::settings::{SettingsAccessor, parse_bool};
use crate::domain::content::ContentItem;
use crate::domain::types::PublishAction;

/// Response extension marking a content render the cache policy applies to.
#[derive(Debug, Clone)]
pub struct RenderedContent {
    pub item: ContentItem,
    pub preview: bool,
}

pub struct FastlyHooks {
    publish: Option<PublishCollector>,
    policy: CachePolicyWriter,
}

impl FastlyHooks {
    /// The purge-on-publish toggle is read here, once.
    pub fn new(
        settings: SettingsAccessor,
        collector: PublishCollector,
        policy: CachePolicyWriter,
    ) -> Self {
        let raw = settings.get(keys::PURGE_ON_PUBLISH, keys::DEFAULT_PURGE_ON_PUBLISH);
        let enabled = parse_bool(&raw).unwrap_or(false);
        info!(
            target = "fastly_cms::hooks",
            purge_on_publish = enabled,
            "fastly hooks registered"
        );

        Self {
            publish: enabled.then_some(collector),
            policy,
        }
    }

    pub fn purges_on_publish(&self) -> bool {
        self.publish.is_some()
    }

    pub fn policy(&self) -> &CachePolicyWriter {
        &self.policy
    }

    /// Stage purge targets for a batch that is about to change state.
    pub async fn on_pre_publish(&self, action: PublishAction, batch: &[ContentItem]) -> StagedPurges {
        match &self.publish {
            Some(collector) => collector.stage(action, batch).await,
            None => StagedPurges::new(),
        }
    }

    /// Dispatch the batch's staged targets. `staged` is always empty afterwards.
    pub fn on_post_publish(&self, staged: &mut StagedPurges) -> DispatchedPurges {
        match &self.publish {
            Some(collector) => collector.dispatch(staged),
            None => {
                staged.take();
                DispatchedPurges::default()
            }
        }
    }

    pub fn on_before_response(
        &self,
        content: &ContentItem,
        is_preview: bool,
        headers: &mut HeaderMap,
    ) -> CachePolicyDecision {
        self.policy.write(content, is_preview, headers)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use url::Url;

    use super::*;
    use crate::application::repos::{RepoError, UrlResolver};
    use crate::domain::content::{ContentCacheFlags, ContentId};
    use crate::domain::types::ContentStatus;
    use crate::fastly::purge::{PurgeError, PurgeResponse, Purger};
    use crate::fastly::settings::MemorySettings;

    struct PathResolver;

    #[async_trait]
    impl UrlResolver for PathResolver {
        async fn resolve_path(&self, id: &ContentId) -> Result<Option<String>, RepoError> {
            Ok(Some(format!("/{id}/")))
        }
    }

    struct FailingPurger;

    #[async_trait]
    impl Purger for FailingPurger {
        async fn purge(&self, _url: &Url) -> Result<PurgeResponse, PurgeError> {
            Err(PurgeError::MissingApplicationId)
        }
    }

    fn hooks(purge_on_publish: &str) -> FastlyHooks {
        let settings = SettingsAccessor::new(Arc::new(
            MemorySettings::new()
                .with(keys::DOMAIN_NAME, "www.example.com")
                .with(keys::PURGE_ON_PUBLISH, purge_on_publish),
        ));
        let collector =
            PublishCollector::new(settings.clone(), Arc::new(PathResolver), Arc::new(FailingPurger));
        FastlyHooks::new(settings.clone(), collector, CachePolicyWriter::new(settings))
    }

    fn published(id: &str) -> ContentItem {
        ContentItem {
            id: ContentId::parse(id).expect("id"),
            name: id.to_string(),
            path: format!("/{id}/"),
            status: ContentStatus::Published,
            flags: ContentCacheFlags::default(),
            body: String::new(),
        }
    }

    #[tokio::test]
    async fn disabled_toggle_stages_nothing() {
        let hooks = hooks("false");
        assert!(!hooks.purges_on_publish());
        let staged = hooks
            .on_pre_publish(PublishAction::Publish, &[published("a")])
            .await;
        assert!(staged.is_empty());
    }

    #[tokio::test]
    async fn malformed_toggle_disables_purging() {
        assert!(!hooks("sometimes").purges_on_publish());
    }

    #[tokio::test]
    async fn failing_purges_still_clear_staging() {
        let hooks = hooks("true");
        let mut staged = hooks
            .on_pre_publish(PublishAction::Publish, &[published("a"), published("b")])
            .await;
        assert_eq!(staged.len(), 2);

        let dispatched = hooks.on_post_publish(&mut staged);
        assert!(staged.is_empty());
        dispatched.settled().await;
    }
}
