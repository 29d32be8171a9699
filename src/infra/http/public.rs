use std::sync::Arc;

use askama::Template;
use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::{
    application::{error::HttpError, repos::ContentRepo},
    config::AdminSettings,
    domain::content::ContentItem,
    fastly::{FastlyHooks, RenderedContent, cache_policy_layer},
};

use super::{
    middleware::{is_authorized, log_responses, set_request_context},
    repo_error_to_http,
};

const SOURCE: &str = "infra::http::public::render_content";

#[derive(Clone)]
pub struct HttpState {
    pub content: Arc<dyn ContentRepo>,
    pub hooks: Arc<FastlyHooks>,
    pub admin: AdminSettings,
}

pub fn build_router(state: HttpState) -> Router {
    let hooks = state.hooks.clone();
    Router::new()
        .route("/", get(render_root))
        .route("/{*path}", get(render_path))
        .with_state(state)
        .layer(middleware::from_fn_with_state(hooks, cache_policy_layer))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RenderQuery {
    preview: bool,
}

async fn render_root(
    State(state): State<HttpState>,
    Query(query): Query<RenderQuery>,
    headers: HeaderMap,
) -> Response {
    render_content(&state, "/", query.preview, &headers).await
}

async fn render_path(
    State(state): State<HttpState>,
    Path(path): Path<String>,
    Query(query): Query<RenderQuery>,
    headers: HeaderMap,
) -> Response {
    render_content(&state, &path, query.preview, &headers).await
}

/// Published content for everyone; any content as a preview for admins.
async fn render_content(
    state: &HttpState,
    path: &str,
    preview: bool,
    headers: &HeaderMap,
) -> Response {
    if preview && !is_authorized(&state.admin, headers) {
        return HttpError::new(
            SOURCE,
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "preview requires the admin bearer token",
        )
        .into_response();
    }

    let item = match state.content.find_by_path(path).await {
        Ok(Some(item)) if preview || item.is_published() => item,
        Ok(_) => {
            return HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Page not found",
                format!("no published content at `{path}`"),
            )
            .into_response();
        }
        Err(err) => return repo_error_to_http(SOURCE, err).into_response(),
    };

    let html = match render_html(&item) {
        Ok(html) => html,
        Err(err) => {
            return HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Template rendering failed",
                &err,
            )
            .into_response();
        }
    };

    let mut response = (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
        .into_response();
    response
        .extensions_mut()
        .insert(RenderedContent { item, preview });
    response
}

#[derive(Template)]
#[template(
    source = "<!doctype html>\n<html><head><title>{{ name }}</title></head><body>{{ body }}</body></html>\n",
    ext = "html"
)]
struct ContentTemplate<'a> {
    name: &'a str,
    body: &'a str,
}

fn render_html(item: &ContentItem) -> Result<String, askama::Error> {
    ContentTemplate {
        name: &item.name,
        body: &item.body,
    }
    .render()
}
