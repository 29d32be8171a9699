//! Axum adapter for the cache-policy header writer.

use std::sync::Arc;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use tracing::instrument;

use super::hooks::{FastlyHooks, RenderedContent};

/// Stamp cache directives on responses that carry a [`RenderedContent`] marker.
///
/// Responses without the marker pass through untouched.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn cache_policy_layer(
    State(hooks): State<Arc<FastlyHooks>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    if let Some(rendered) = response.extensions_mut().remove::<RenderedContent>() {
        hooks.on_before_response(&rendered.item, rendered.preview, response.headers_mut());
    }

    response
}
