use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockpile_core::LedgerError;

/// Map engine failures onto transport-appropriate responses.
pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    match err {
        LedgerError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        LedgerError::DuplicateKey(msg) => json_error(StatusCode::CONFLICT, "duplicate_key", msg),
        LedgerError::InsufficientStock { available, requested } => json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "insufficient_stock",
            format!("insufficient stock: available {available}, requested {requested}"),
        ),
        LedgerError::InvalidArgument(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        LedgerError::ConcurrencyConflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        LedgerError::Storage(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", msg)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
