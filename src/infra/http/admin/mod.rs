mod content;
mod fastly;
mod health;
mod state;

pub use state::AdminState;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use super::middleware::{log_responses, require_admin_token, set_request_context};

pub fn build_admin_router(state: AdminState) -> Router {
    let admin = state.admin.clone();
    Router::new()
        .route(
            "/admin/content/{id}/publish",
            post(content::admin_content_publish),
        )
        .route(
            "/admin/content/{id}/unpublish",
            post(content::admin_content_unpublish),
        )
        .route("/admin/fastly/purge", post(fastly::admin_fastly_purge))
        .route(
            "/admin/fastly/purge-all",
            post(fastly::admin_fastly_purge_all),
        )
        .route("/admin/health", get(health::admin_health))
        .with_state(state)
        .layer(middleware::from_fn_with_state(admin, require_admin_token))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}
