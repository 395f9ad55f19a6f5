use axum::Router;

pub mod audit;
pub mod inventory;
pub mod system;

/// All `/api/v1` routes.
pub fn router() -> Router {
    Router::new()
        .merge(inventory::router())
        .merge(audit::router())
}
