//! Manual purge endpoints.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::AdminState;
use crate::application::error::HttpError;
use crate::domain::content::ContentId;
use crate::fastly::collector::purge_target;
use crate::fastly::keys;
use crate::fastly::purge::{PurgeError, PurgeReceipt, PurgeResponse};
use crate::infra::http::repo_error_to_http;

const PURGE_SOURCE: &str = "infra::http::admin::fastly::admin_fastly_purge";
const PURGE_ALL_SOURCE: &str = "infra::http::admin::fastly::admin_fastly_purge_all";

#[derive(Debug, Serialize)]
struct PurgeView {
    url: String,
    status: u16,
    receipt: Option<PurgeReceipt>,
}

/// Purge one content item; the body is its id as plain text.
pub(super) async fn admin_fastly_purge(State(state): State<AdminState>, body: String) -> Response {
    if body.trim().is_empty() {
        return HttpError::new(
            PURGE_SOURCE,
            StatusCode::BAD_REQUEST,
            "Content id is required",
            "empty request body",
        )
        .into_response();
    }

    let Some(domain) = state.settings.get_non_blank(keys::DOMAIN_NAME) else {
        return HttpError::new(
            PURGE_SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Fastly domain is not configured",
            format!("`{}` is blank", keys::DOMAIN_NAME),
        )
        .into_response();
    };

    let id = match ContentId::parse(&body) {
        Ok(id) => id,
        Err(err) => {
            return HttpError::from_error(
                PURGE_SOURCE,
                StatusCode::BAD_REQUEST,
                "Invalid content id",
                &err,
            )
            .into_response();
        }
    };

    let path = match state.resolver.resolve_path(&id).await {
        Ok(Some(path)) => path,
        Ok(None) => {
            return HttpError::new(
                PURGE_SOURCE,
                StatusCode::NOT_FOUND,
                "Content not found",
                format!("content `{id}` has no public url"),
            )
            .into_response();
        }
        Err(err) => return repo_error_to_http(PURGE_SOURCE, err).into_response(),
    };

    let url = match purge_target(&domain, &path) {
        Ok(url) => url,
        Err(err) => {
            return HttpError::from_error(
                PURGE_SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Fastly domain is not a valid url",
                &err,
            )
            .into_response();
        }
    };

    match state.purger.purge(&url).await {
        Ok(response) => purge_response(response),
        Err(err) => purge_error(PURGE_SOURCE, err),
    }
}

pub(super) async fn admin_fastly_purge_all(State(state): State<AdminState>) -> Response {
    match state.purger.purge_all().await {
        Ok(response) => purge_response(response),
        Err(err) => purge_error(PURGE_ALL_SOURCE, err),
    }
}

/// The CDN's status is passed through unchanged.
fn purge_response(response: PurgeResponse) -> Response {
    let view = PurgeView {
        url: response.url.to_string(),
        status: response.status.as_u16(),
        receipt: response.receipt,
    };
    (response.status, Json(view)).into_response()
}

fn purge_error(source: &'static str, err: PurgeError) -> Response {
    let (status, message) = match &err {
        PurgeError::Transport { .. } => (StatusCode::BAD_GATEWAY, "Fastly request failed"),
        PurgeError::MissingApplicationId => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Fastly application id is not configured",
        ),
        PurgeError::PurgeAllUnsupported => (StatusCode::NOT_IMPLEMENTED, "Purge all unavailable"),
        PurgeError::Client(_)
        | PurgeError::Credential(_)
        | PurgeError::Method(_)
        | PurgeError::Url(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Fastly purge failed"),
    };
    HttpError::from_error(source, status, message, &err).into_response()
}
