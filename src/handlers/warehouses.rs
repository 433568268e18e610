use axum::extract::State;
use serde_json::json;
use uuid::Uuid;

use super::{list_page, products::scoped_products};
use crate::{
    error::{AppError, AppResult},
    extractors::{PathParam, QueryParams, ValidatedJson},
    listing::ListParams,
    middleware::CurrentUser,
    models::{
        AuditAction, AuditEntity, ProductFilter, ProductView, Warehouse, WarehouseChanges,
        WarehouseFilter, WarehouseInput, MANAGERS,
    },
    response::{ApiResponse, ApiResult, Created},
    state::AppState,
};

pub async fn list_warehouses(
    State(state): State<AppState>,
    _user: CurrentUser,
    QueryParams(filter): QueryParams<WarehouseFilter>,
    QueryParams(params): QueryParams<ListParams>,
) -> ApiResult<Vec<Warehouse>> {
    let warehouses = state.db.warehouses.list(&filter).await?;
    list_page(warehouses, &params)
}

pub async fn get_warehouse(
    State(state): State<AppState>,
    _user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<Warehouse> {
    let warehouse = state
        .db
        .warehouses
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Bodega"))?;
    Ok(ApiResponse::ok(warehouse))
}

pub async fn create_warehouse(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(input): ValidatedJson<WarehouseInput>,
) -> AppResult<Created<Warehouse>> {
    user.require_role(MANAGERS)?;
    let warehouse = state.db.warehouses.create(&input).await?;

    log::info!("warehouse {} created by {}", warehouse.id, user.id());
    state
        .audit
        .record(
            user.id(),
            AuditAction::Crear,
            AuditEntity::Bodega,
            warehouse.id,
            Some(json!({ "nombre": warehouse.name })),
        )
        .await;

    Ok(Created(ApiResponse::ok(warehouse).with_message("Bodega creada")))
}

pub async fn update_warehouse(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
    ValidatedJson(changes): ValidatedJson<WarehouseChanges>,
) -> ApiResult<Warehouse> {
    user.require_role(MANAGERS)?;
    let warehouse = state
        .db
        .warehouses
        .update(id, &changes)
        .await?
        .ok_or_else(|| AppError::not_found("Bodega"))?;

    state
        .audit
        .record(user.id(), AuditAction::Actualizar, AuditEntity::Bodega, id, None)
        .await;

    Ok(ApiResponse::ok(warehouse).with_message("Bodega actualizada"))
}

pub async fn delete_warehouse(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<()> {
    user.require_role(MANAGERS)?;
    if !state.db.warehouses.delete(id).await? {
        return Err(AppError::not_found("Bodega"));
    }

    log::info!("warehouse {} deleted by {}", id, user.id());
    state
        .audit
        .record(user.id(), AuditAction::Eliminar, AuditEntity::Bodega, id, None)
        .await;

    Ok(ApiResponse::message("Bodega eliminada"))
}

pub async fn warehouse_products(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
    QueryParams(params): QueryParams<ListParams>,
) -> ApiResult<Vec<ProductView>> {
    if user.scoped_warehouse().is_some_and(|scope| scope != id) {
        return Err(AppError::Forbidden);
    }
    if state.db.warehouses.get(id).await?.is_none() {
        return Err(AppError::not_found("Bodega"));
    }
    let filter = ProductFilter {
        warehouse_id: Some(id),
        ..Default::default()
    };
    let products = scoped_products(&state, &user, filter).await?;
    list_page(products, &params)
}
