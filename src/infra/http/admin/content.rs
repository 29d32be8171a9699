use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::AdminState;
use crate::application::error::AppError;
use crate::application::publish::PublishOutcome;
use crate::domain::content::ContentId;
use crate::domain::types::{ContentStatus, PublishAction};

#[derive(Debug, Serialize)]
struct StatusChangeView {
    id: ContentId,
    status: ContentStatus,
    purges: usize,
}

pub(super) async fn admin_content_publish(
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> Response {
    change_status(&state, PublishAction::Publish, &id).await
}

pub(super) async fn admin_content_unpublish(
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> Response {
    change_status(&state, PublishAction::Unpublish, &id).await
}

/// Purges keep running after the response is sent.
async fn change_status(state: &AdminState, action: PublishAction, raw_id: &str) -> Response {
    let id = match ContentId::parse(raw_id) {
        Ok(id) => id,
        Err(err) => return AppError::from(err).into_response(),
    };

    match state.publish.run(action, std::slice::from_ref(&id)).await {
        Ok(PublishOutcome { items, purges }) => {
            let status = items
                .first()
                .map(|item| item.status)
                .unwrap_or(action.resulting_status());
            Json(StatusChangeView {
                id,
                status,
                purges: purges.len(),
            })
            .into_response()
        }
        Err(err) => err.into_response(),
    }
}
