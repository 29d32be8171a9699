//! Publish-event URL collector.
//!
//! The pre-publish hook resolves every live item in the batch to an absolute
//! URL and returns them as a [`StagedPurges`] value owned by that batch. The
//! post-publish hook drains it and hands each URL to the purger on its own
//! task. Nothing is shared between batches.

use std::sync::Arc;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use super::keys;
use super::purge::Purger;
use super::settings::SettingsAccessor;
use crate::application::repos::UrlResolver;
use crate::domain::content::{ContentItem, normalize_path};
use crate::domain::types::PublishAction;

/// URLs awaiting purge for one publish or unpublish batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedPurges {
    urls: Vec<Url>,
}

impl StagedPurges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, url: Url) {
        self.urls.push(url);
    }

    pub fn urls(&self) -> &[Url] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Move every URL staged in `other` to the end of this list.
    pub fn append(&mut self, other: &mut StagedPurges) {
        self.urls.append(&mut other.urls);
    }

    /// Remove and return every staged URL in staging order.
    pub fn take(&mut self) -> Vec<Url> {
        std::mem::take(&mut self.urls)
    }
}

/// Handles of purges launched by one post-publish pass.
///
/// Dropping this detaches the tasks; [`DispatchedPurges::settled`] waits for them.
#[derive(Debug, Default)]
pub struct DispatchedPurges {
    handles: Vec<JoinHandle<()>>,
}

impl DispatchedPurges {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub async fn settled(self) {
        for result in join_all(self.handles).await {
            if let Err(err) = result {
                warn!(
                    target = "fastly_cms::collector",
                    error = %err,
                    "purge task did not complete"
                );
            }
        }
    }
}

pub struct PublishCollector {
    settings: SettingsAccessor,
    resolver: Arc<dyn UrlResolver>,
    purger: Arc<dyn Purger>,
}

impl PublishCollector {
    pub fn new(
        settings: SettingsAccessor,
        resolver: Arc<dyn UrlResolver>,
        purger: Arc<dyn Purger>,
    ) -> Self {
        Self {
            settings,
            resolver,
            purger,
        }
    }

    /// Resolve the live items of a batch to purge targets.
    pub async fn stage(&self, action: PublishAction, batch: &[ContentItem]) -> StagedPurges {
        let mut staged = StagedPurges::new();

        let Some(domain) = self.settings.get_non_blank(keys::DOMAIN_NAME) else {
            warn!(
                target = "fastly_cms::collector",
                action = action.as_str(),
                items = batch.len(),
                "domain name is not configured; nothing staged"
            );
            return staged;
        };

        for item in batch.iter().filter(|item| item.is_published()) {
            let path = match self.resolver.resolve_path(&item.id).await {
                Ok(Some(path)) => path,
                Ok(None) => {
                    debug!(
                        target = "fastly_cms::collector",
                        content_id = %item.id,
                        "content has no public url; skipped"
                    );
                    continue;
                }
                Err(err) => {
                    warn!(
                        target = "fastly_cms::collector",
                        content_id = %item.id,
                        error = %err,
                        "url resolution failed; skipped"
                    );
                    continue;
                }
            };

            match purge_target(&domain, &path) {
                Ok(url) => staged.push(url),
                Err(err) => warn!(
                    target = "fastly_cms::collector",
                    content_id = %item.id,
                    domain = %domain,
                    path = %path,
                    error = %err,
                    "purge target is not a valid url; skipped"
                ),
            }
        }

        debug!(
            target = "fastly_cms::collector",
            action = action.as_str(),
            staged = staged.len(),
            "purge targets staged"
        );
        staged
    }

    /// Launch one purge per staged URL. `staged` is empty when this returns.
    pub fn dispatch(&self, staged: &mut StagedPurges) -> DispatchedPurges {
        let handles = staged
            .take()
            .into_iter()
            .map(|url| {
                info!(target = "fastly_cms::collector", url = %url, "purge url called");
                let purger = self.purger.clone();
                tokio::spawn(async move {
                    if let Err(err) = purger.purge(&url).await {
                        warn!(
                            target = "fastly_cms::collector",
                            url = %url,
                            error = %err,
                            "purge failed"
                        );
                    }
                })
            })
            .collect();

        DispatchedPurges { handles }
    }
}

/// Absolute URL for a content path under the configured domain.
///
/// A domain without a scheme is served over https.
pub fn purge_target(domain: &str, path: &str) -> Result<Url, url::ParseError> {
    let domain = domain.trim().trim_end_matches('/');
    let path = normalize_path(path);
    if domain.contains("://") {
        Url::parse(&format!("{domain}{path}"))
    } else {
        Url::parse(&format!("https://{domain}{path}"))
    }
}
