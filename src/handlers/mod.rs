pub mod audit;
pub mod auth;
pub mod movements;
pub mod panel;
pub mod products;
pub mod purchase_orders;
pub mod reports;
pub mod suppliers;
pub mod users;
pub mod warehouses;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    database::Database,
    error::{AppError, AppResult},
    listing::{paginate, ListParams, Sortable},
    response::{ApiResponse, ApiResult},
    state::AppState,
};

/// Sorts and pages a list result into the enveloped response.
pub(crate) fn list_page<T>(items: Vec<T>, params: &ListParams) -> ApiResult<Vec<T>>
where
    T: Sortable + Serialize,
{
    let (page, meta) = paginate(items, params)?;
    Ok(ApiResponse::list(page, meta))
}

pub(crate) async fn check_supplier(db: &Database, id: Option<Uuid>) -> AppResult<()> {
    if let Some(id) = id {
        if db.suppliers.get(id).await?.is_none() {
            return Err(AppError::BadRequest("El proveedor indicado no existe".into()));
        }
    }
    Ok(())
}

pub(crate) async fn check_warehouse(db: &Database, id: Option<Uuid>) -> AppResult<()> {
    if let Some(id) = id {
        if db.warehouses.get(id).await?.is_none() {
            return Err(AppError::BadRequest("La bodega indicada no existe".into()));
        }
    }
    Ok(())
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.health.ping().await {
        Ok(()) => (
            StatusCode::OK,
            ApiResponse::ok(json!({ "status": "ok", "database": "ok" })),
        ),
        Err(e) => {
            log::error!("health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiResponse {
                    success: false,
                    data: Some(json!({ "status": "degraded", "database": "unreachable" })),
                    message: Some(e.to_string()),
                    meta: None,
                },
            )
        }
    }
}
