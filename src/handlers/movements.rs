use std::collections::HashSet;

use axum::extract::State;
use serde_json::json;
use uuid::Uuid;

use super::{list_page, products::visible_product};
use crate::{
    error::{AppError, AppResult},
    extractors::{PathParam, QueryParams, ValidatedJson},
    listing::ListParams,
    middleware::CurrentUser,
    models::{
        AuditAction, AuditEntity, CreateMovement, Movement, MovementFilter, NewMovement,
        ProductFilter,
    },
    response::{ApiResponse, ApiResult, Created},
    state::AppState,
};

pub async fn list_movements(
    State(state): State<AppState>,
    user: CurrentUser,
    QueryParams(filter): QueryParams<MovementFilter>,
    QueryParams(params): QueryParams<ListParams>,
) -> ApiResult<Vec<Movement>> {
    let mut movements = state.db.movements.list(&filter).await?;

    if let Some(warehouse_id) = user.scoped_warehouse() {
        let scope = ProductFilter {
            warehouse_id: Some(warehouse_id),
            ..Default::default()
        };
        let visible: HashSet<Uuid> = state
            .db
            .products
            .list(&scope)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();
        movements.retain(|m| visible.contains(&m.product_id));
    }

    list_page(movements, &params)
}

pub async fn get_movement(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<Movement> {
    let movement = state
        .db
        .movements
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Movimiento"))?;
    if user.scoped_warehouse().is_some() {
        visible_product(&state, &user, movement.product_id).await?;
    }
    Ok(ApiResponse::ok(movement))
}

pub async fn create_movement(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(input): ValidatedJson<CreateMovement>,
) -> AppResult<Created<Movement>> {
    let product = state
        .db
        .products
        .get(input.product_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("El producto indicado no existe".into()))?;
    user.ensure_product_access(&product)?;
    if !product.active {
        return Err(AppError::BadRequest(
            "No se pueden registrar movimientos de un producto inactivo".into(),
        ));
    }

    let movement = state
        .db
        .movements
        .record(&NewMovement::from_request(input, user.id()))
        .await?;

    log::info!(
        "{} of {} units on product {}: {} -> {}",
        movement.movement_type,
        movement.quantity,
        movement.product_id,
        movement.previous_stock,
        movement.new_stock
    );
    state
        .audit
        .record(
            user.id(),
            AuditAction::Movimiento,
            AuditEntity::Movimiento,
            movement.id,
            Some(json!({
                "producto_id": movement.product_id,
                "tipo": movement.movement_type,
                "cantidad": movement.quantity,
                "stock_anterior": movement.previous_stock,
                "stock_nuevo": movement.new_stock,
            })),
        )
        .await;

    Ok(Created(
        ApiResponse::ok(movement).with_message("Movimiento registrado"),
    ))
}
