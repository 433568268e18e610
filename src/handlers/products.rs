use axum::extract::State;
use serde_json::json;
use uuid::Uuid;

use super::{check_supplier, check_warehouse, list_page};
use crate::{
    error::{AppError, AppResult},
    extractors::{PathParam, QueryParams, ValidatedJson},
    listing::ListParams,
    middleware::CurrentUser,
    models::{
        AuditAction, AuditEntity, CreateProduct, Movement, MovementFilter, MovementType,
        NewMovement, Product, ProductChanges, ProductFilter, ProductView, MANAGERS,
    },
    response::{ApiResponse, ApiResult, Created},
    state::AppState,
};

pub const OPENING_STOCK_REASON: &str = "Stock inicial";

/// Loads a product the caller is allowed to see.
pub(crate) async fn visible_product(state: &AppState, user: &CurrentUser, id: Uuid) -> AppResult<Product> {
    let product = state
        .db
        .products
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Producto"))?;
    user.ensure_product_access(&product)?;
    Ok(product)
}

/// Runs a product query, confined to the operator's warehouse when they have one.
pub(crate) async fn scoped_products(
    state: &AppState,
    user: &CurrentUser,
    mut filter: ProductFilter,
) -> AppResult<Vec<ProductView>> {
    if let Some(warehouse_id) = user.scoped_warehouse() {
        filter.warehouse_id = Some(warehouse_id);
    }
    let products = state.db.products.list(&filter).await?;
    Ok(products.into_iter().map(ProductView::from).collect())
}

pub async fn list_products(
    State(state): State<AppState>,
    user: CurrentUser,
    QueryParams(filter): QueryParams<ProductFilter>,
    QueryParams(params): QueryParams<ListParams>,
) -> ApiResult<Vec<ProductView>> {
    let products = scoped_products(&state, &user, filter).await?;
    list_page(products, &params)
}

pub async fn low_stock_products(
    State(state): State<AppState>,
    user: CurrentUser,
    QueryParams(params): QueryParams<ListParams>,
) -> ApiResult<Vec<ProductView>> {
    let filter = ProductFilter {
        low_stock: Some(true),
        active: Some(true),
        ..Default::default()
    };
    let products = scoped_products(&state, &user, filter).await?;
    list_page(products, &params)
}

pub async fn get_product(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<ProductView> {
    let product = visible_product(&state, &user, id).await?;
    Ok(ApiResponse::ok(product.into()))
}

pub async fn create_product(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(input): ValidatedJson<CreateProduct>,
) -> AppResult<Created<ProductView>> {
    user.require_role(MANAGERS)?;
    input.check()?;
    check_supplier(&state.db, input.supplier_id).await?;
    check_warehouse(&state.db, input.warehouse_id).await?;

    let mut product = state.db.products.create(&input).await?;

    if input.stock > 0 {
        let opening = NewMovement {
            product_id: product.id,
            movement_type: MovementType::Entrada,
            quantity: input.stock,
            reason: Some(OPENING_STOCK_REASON.to_string()),
            reference: None,
            user_id: Some(user.id()),
        };
        let movement = state.db.movements.record(&opening).await?;
        product.stock = movement.new_stock;
        product.updated_at = movement.created_at;
    }

    log::info!("product {} ({}) created by {}", product.code, product.id, user.id());
    state
        .audit
        .record(
            user.id(),
            AuditAction::Crear,
            AuditEntity::Producto,
            product.id,
            Some(json!({ "codigo": product.code, "nombre": product.name, "stock": product.stock })),
        )
        .await;

    Ok(Created(
        ApiResponse::ok(product.into()).with_message("Producto creado"),
    ))
}

pub async fn update_product(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
    ValidatedJson(changes): ValidatedJson<ProductChanges>,
) -> ApiResult<ProductView> {
    user.require_role(MANAGERS)?;
    let current = state
        .db
        .products
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Producto"))?;
    changes.check(&current)?;
    check_supplier(&state.db, changes.supplier_id).await?;
    check_warehouse(&state.db, changes.warehouse_id).await?;

    let product = state
        .db
        .products
        .update(id, &changes)
        .await?
        .ok_or_else(|| AppError::not_found("Producto"))?;

    log::info!("product {} updated by {}", product.id, user.id());
    state
        .audit
        .record(
            user.id(),
            AuditAction::Actualizar,
            AuditEntity::Producto,
            product.id,
            Some(json!({ "codigo": product.code })),
        )
        .await;

    Ok(ApiResponse::ok(product.into()).with_message("Producto actualizado"))
}

pub async fn delete_product(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<()> {
    user.require_role(MANAGERS)?;
    if !state.db.products.delete(id).await? {
        return Err(AppError::not_found("Producto"));
    }

    log::info!("product {} deleted by {}", id, user.id());
    state
        .audit
        .record(user.id(), AuditAction::Eliminar, AuditEntity::Producto, id, None)
        .await;

    Ok(ApiResponse::message("Producto eliminado"))
}

pub async fn product_movements(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
    QueryParams(params): QueryParams<ListParams>,
) -> ApiResult<Vec<Movement>> {
    visible_product(&state, &user, id).await?;
    let filter = MovementFilter {
        product_id: Some(id),
        ..Default::default()
    };
    let movements = state.db.movements.list(&filter).await?;
    list_page(movements, &params)
}
