use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockpile_core::StockRecordId;
use stockpile_inventory::AuditActor;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/inventory", post(create_stock).get(list_all))
        .route("/inventory/low-stock", get(list_low_stock))
        .route("/inventory/damaged", get(list_damaged))
        .route("/inventory/sku/:sku", get(get_by_sku))
        .route(
            "/inventory/:id",
            get(get_by_id).put(update_stock).delete(delete_stock),
        )
        .route("/inventory/:id/adjust", post(adjust_stock))
        .route("/inventory/:id/damage", post(record_damaged_goods))
        .route("/inventory/:id/transactions", get(list_transactions))
        .route("/inventory/:id/audit-logs", get(list_audit_logs))
}

/// Who is performing the mutation, for the audit trail.
fn actor_from_headers(headers: &HeaderMap) -> AuditActor {
    let mut actor = AuditActor::default();
    if let Some(performed_by) = headers.get("x-performed-by").and_then(|v| v.to_str().ok()) {
        if !performed_by.trim().is_empty() {
            actor.performed_by = performed_by.trim().to_string();
        }
    }
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(addr) = forwarded.split(',').next() {
            if !addr.trim().is_empty() {
                actor.source_address = addr.trim().to_string();
            }
        }
    }
    actor
}

fn parse_id(id: &str) -> Result<StockRecordId, axum::response::Response> {
    id.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid stock record id")
    })
}

pub async fn create_stock(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Json(body): Json<dto::ProductStockRequest>,
) -> axum::response::Response {
    let draft = match body.into_draft() {
        Ok(draft) => draft,
        Err(res) => return res,
    };
    let actor = actor_from_headers(&headers);

    match services
        .with_ledger(move |ledger| ledger.create_stock(draft, &actor))
        .await
    {
        Ok(record) => (StatusCode::CREATED, Json(dto::stock_to_json(&record))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_by_id(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.with_ledger(move |ledger| ledger.get_by_id(id)).await {
        Ok(record) => (StatusCode::OK, Json(dto::stock_to_json(&record))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_by_sku(
    Extension(services): Extension<Arc<AppServices>>,
    Path(sku): Path<String>,
) -> axum::response::Response {
    match services
        .with_ledger(move |ledger| ledger.get_by_sku(&sku))
        .await
    {
        Ok(record) => (StatusCode::OK, Json(dto::stock_to_json(&record))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_all(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.with_ledger(|ledger| ledger.list_all()).await {
        Ok(records) => (StatusCode::OK, Json(dto::stocks_to_json(&records))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_low_stock(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.with_ledger(|ledger| ledger.list_low_stock()).await {
        Ok(records) => (StatusCode::OK, Json(dto::stocks_to_json(&records))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_damaged(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.with_ledger(|ledger| ledger.list_damaged()).await {
        Ok(records) => (StatusCode::OK, Json(dto::stocks_to_json(&records))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn update_stock(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<dto::ProductStockRequest>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let draft = match body.into_draft() {
        Ok(draft) => draft,
        Err(res) => return res,
    };
    let actor = actor_from_headers(&headers);

    match services
        .with_ledger(move |ledger| ledger.update_stock(id, draft, &actor))
        .await
    {
        Ok(record) => (StatusCode::OK, Json(dto::stock_to_json(&record))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<dto::StockAdjustmentRequest>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let adjustment = match body.into_adjustment() {
        Ok(adjustment) => adjustment,
        Err(res) => return res,
    };
    let actor = actor_from_headers(&headers);

    match services
        .with_ledger(move |ledger| ledger.adjust_stock(id, adjustment, &actor))
        .await
    {
        Ok(transaction) => {
            (StatusCode::OK, Json(dto::transaction_to_json(&transaction))).into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn record_damaged_goods(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<dto::DamagedGoodsRequest>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let report = match body.into_report() {
        Ok(report) => report,
        Err(res) => return res,
    };
    let actor = actor_from_headers(&headers);

    match services
        .with_ledger(move |ledger| ledger.record_damaged_goods(id, report, &actor))
        .await
    {
        Ok(transaction) => {
            (StatusCode::OK, Json(dto::transaction_to_json(&transaction))).into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn delete_stock(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let actor = actor_from_headers(&headers);

    match services
        .with_ledger(move |ledger| ledger.delete_stock(id, &actor))
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services
        .with_ledger(move |ledger| ledger.transactions_for_product(id))
        .await
    {
        Ok(transactions) => {
            (StatusCode::OK, Json(dto::transactions_to_json(&transactions))).into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_audit_logs(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services
        .with_ledger(move |ledger| ledger.audit_logs_for_product(id))
        .await
    {
        Ok(entries) => (StatusCode::OK, Json(dto::audits_to_json(&entries))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
