use axum::{Json, extract::State};
use serde::Serialize;

use super::AdminState;
use crate::fastly::keys;

#[derive(Debug, Serialize)]
pub(super) struct HealthView {
    status: &'static str,
    domain_configured: bool,
    application_id_configured: bool,
}

pub(super) async fn admin_health(State(state): State<AdminState>) -> Json<HealthView> {
    Json(HealthView {
        status: "ok",
        domain_configured: state.settings.get_non_blank(keys::DOMAIN_NAME).is_some(),
        application_id_configured: state.settings.get_non_blank(keys::APPLICATION_ID).is_some(),
    })
}
