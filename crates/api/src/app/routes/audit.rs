use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/audit", get(all_audit_logs))
}

/// All audit logs across the system, for any tracked entity type.
pub async fn all_audit_logs(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.with_ledger(|ledger| ledger.all_audit_logs()).await {
        Ok(entries) => (StatusCode::OK, Json(dto::audits_to_json(&entries))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
