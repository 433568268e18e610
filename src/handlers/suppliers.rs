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
        AuditAction, AuditEntity, ProductFilter, ProductView, Supplier, SupplierChanges,
        SupplierFilter, SupplierInput, MANAGERS,
    },
    response::{ApiResponse, ApiResult, Created},
    state::AppState,
};

pub async fn list_suppliers(
    State(state): State<AppState>,
    _user: CurrentUser,
    QueryParams(filter): QueryParams<SupplierFilter>,
    QueryParams(params): QueryParams<ListParams>,
) -> ApiResult<Vec<Supplier>> {
    let suppliers = state.db.suppliers.list(&filter).await?;
    list_page(suppliers, &params)
}

pub async fn get_supplier(
    State(state): State<AppState>,
    _user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<Supplier> {
    let supplier = state
        .db
        .suppliers
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Proveedor"))?;
    Ok(ApiResponse::ok(supplier))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(input): ValidatedJson<SupplierInput>,
) -> AppResult<Created<Supplier>> {
    user.require_role(MANAGERS)?;
    let supplier = state.db.suppliers.create(&input).await?;

    log::info!("supplier {} created by {}", supplier.id, user.id());
    state
        .audit
        .record(
            user.id(),
            AuditAction::Crear,
            AuditEntity::Proveedor,
            supplier.id,
            Some(json!({ "nombre": supplier.name, "rut": supplier.tax_id })),
        )
        .await;

    Ok(Created(
        ApiResponse::ok(supplier).with_message("Proveedor creado"),
    ))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
    ValidatedJson(changes): ValidatedJson<SupplierChanges>,
) -> ApiResult<Supplier> {
    user.require_role(MANAGERS)?;
    let supplier = state
        .db
        .suppliers
        .update(id, &changes)
        .await?
        .ok_or_else(|| AppError::not_found("Proveedor"))?;

    state
        .audit
        .record(user.id(), AuditAction::Actualizar, AuditEntity::Proveedor, id, None)
        .await;

    Ok(ApiResponse::ok(supplier).with_message("Proveedor actualizado"))
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<()> {
    user.require_role(MANAGERS)?;
    if !state.db.suppliers.delete(id).await? {
        return Err(AppError::not_found("Proveedor"));
    }

    log::info!("supplier {} deleted by {}", id, user.id());
    state
        .audit
        .record(user.id(), AuditAction::Eliminar, AuditEntity::Proveedor, id, None)
        .await;

    Ok(ApiResponse::message("Proveedor eliminado"))
}

pub async fn supplier_products(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
    QueryParams(params): QueryParams<ListParams>,
) -> ApiResult<Vec<ProductView>> {
    if state.db.suppliers.get(id).await?.is_none() {
        return Err(AppError::not_found("Proveedor"));
    }
    let filter = ProductFilter {
        supplier_id: Some(id),
        ..Default::default()
    };
    let products = scoped_products(&state, &user, filter).await?;
    list_page(products, &params)
}
