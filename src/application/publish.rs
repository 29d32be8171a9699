//! Publish and unpublish batches, wrapped in the purge hooks.

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::error::AppError;
use crate::application::repos::ContentRepo;
use crate::domain::content::{ContentId, ContentItem};
use crate::domain::error::DomainError;
use crate::domain::types::{ContentStatus, PublishAction};
use crate::fastly::{DispatchedPurges, FastlyHooks, StagedPurges};

/// Result of one batch. Dropping `purges` leaves them running in the background.
#[derive(Debug)]
pub struct PublishOutcome {
    pub items: Vec<ContentItem>,
    pub purges: DispatchedPurges,
}

#[derive(Clone)]
pub struct PublishService {
    repo: Arc<dyn ContentRepo>,
    hooks: Arc<FastlyHooks>,
}

impl PublishService {
    pub fn new(repo: Arc<dyn ContentRepo>, hooks: Arc<FastlyHooks>) -> Self {
        Self { repo, hooks }
    }

    pub async fn publish(&self, ids: &[ContentId]) -> Result<PublishOutcome, AppError> {
        self.run(PublishAction::Publish, ids).await
    }

    pub async fn unpublish(&self, ids: &[ContentId]) -> Result<PublishOutcome, AppError> {
        self.run(PublishAction::Unpublish, ids).await
    }

    /// Pre hook, status change, post hook.
    ///
    /// Targets are staged per item. When a status change fails, the items
    /// already changed are still purged before the error is returned.
    pub async fn run(
        &self,
        action: PublishAction,
        ids: &[ContentId],
    ) -> Result<PublishOutcome, AppError> {
        let target = action.resulting_status();
        let mut batch = Vec::with_capacity(ids.len());
        for id in ids {
            let item = self
                .repo
                .find_content(id)
                .await?
                .ok_or_else(|| DomainError::content_not_found(id.as_str()))?;
            if item.status == ContentStatus::Trashed {
                return Err(DomainError::InvalidTransition {
                    id: id.to_string(),
                    from: item.status.as_str(),
                    to: target.as_str(),
                }
                .into());
            }
            batch.push(item);
        }

        // Publishing stages items as they will be; unpublishing as they still are.
        let mut pending = Vec::with_capacity(batch.len());
        for item in &batch {
            let snapshot = match action {
                PublishAction::Publish => item.with_status(target),
                PublishAction::Unpublish => item.clone(),
            };
            pending.push(
                self.hooks
                    .on_pre_publish(action, std::slice::from_ref(&snapshot))
                    .await,
            );
        }

        let mut committed = StagedPurges::new();
        for (item, mut staged) in batch.iter().zip(pending) {
            if let Err(err) = self.repo.set_status(&item.id, target).await {
                let purges = self.hooks.on_post_publish(&mut committed);
                warn!(
                    target = "fastly_cms::application::publish",
                    action = action.as_str(),
                    content_id = %item.id,
                    error = %err,
                    purges = purges.len(),
                    "status change failed; purging content already changed"
                );
                return Err(err.into());
            }
            committed.append(&mut staged);
        }

        let purges = self.hooks.on_post_publish(&mut committed);
        info!(
            target = "fastly_cms::application::publish",
            action = action.as_str(),
            items = batch.len(),
            purges = purges.len(),
            "batch completed"
        );

        Ok(PublishOutcome {
            items: batch.into_iter().map(|item| item.with_status(target)).collect(),
            purges,
        })
    }
}
