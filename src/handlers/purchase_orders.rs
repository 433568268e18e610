use axum::extract::State;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::{check_supplier, check_warehouse, list_page};
use crate::{
    database::Database,
    error::{AppError, AppResult},
    extractors::{PathParam, QueryParams, ValidatedJson},
    listing::ListParams,
    middleware::CurrentUser,
    models::{
        price_items, AuditAction, AuditEntity, CreatePurchaseOrder, Movement, NewPurchaseOrder,
        OrderChanges, OrderFilter, OrderItemInput, PurchaseOrder, PurchaseOrderDetail,
        RejectPurchaseOrder, UpdatePurchaseOrder, MANAGERS,
    },
    response::{ApiResponse, ApiResult, Created},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct CompletedOrder {
    pub orden: PurchaseOrder,
    pub movimientos: Vec<Movement>,
}

/// Every line must name an existing product the caller may move stock for.
async fn check_products(db: &Database, user: &CurrentUser, items: &[OrderItemInput]) -> AppResult<()> {
    for item in items {
        let product = db.products.get(item.product_id).await?.ok_or_else(|| {
            AppError::BadRequest(format!("El producto {} no existe", item.product_id))
        })?;
        user.ensure_product_access(&product)?;
    }
    Ok(())
}

/// Creators may change their own orders; anyone else needs a manager role.
fn ensure_owner_or_manager(user: &CurrentUser, order: &PurchaseOrder) -> AppResult<()> {
    if order.created_by == Some(user.id()) {
        Ok(())
    } else {
        user.require_role(MANAGERS)
    }
}

async fn find_order(state: &AppState, id: Uuid) -> AppResult<PurchaseOrderDetail> {
    state
        .db
        .orders
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Orden de compra"))
}

pub async fn list_orders(
    State(state): State<AppState>,
    _user: CurrentUser,
    QueryParams(filter): QueryParams<OrderFilter>,
    QueryParams(params): QueryParams<ListParams>,
) -> ApiResult<Vec<PurchaseOrder>> {
    let orders = state.db.orders.list(&filter).await?;
    list_page(orders, &params)
}

pub async fn get_order(
    State(state): State<AppState>,
    _user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<PurchaseOrderDetail> {
    Ok(ApiResponse::ok(find_order(&state, id).await?))
}

pub async fn create_order(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(input): ValidatedJson<CreatePurchaseOrder>,
) -> AppResult<Created<PurchaseOrderDetail>> {
    check_supplier(&state.db, Some(input.supplier_id)).await?;
    check_warehouse(&state.db, input.warehouse_id).await?;
    check_products(&state.db, &user, &input.items).await?;

    let (items, total) = price_items(&input.items)?;
    let order = NewPurchaseOrder {
        number: PurchaseOrder::generate_number(Utc::now()),
        supplier_id: input.supplier_id,
        warehouse_id: input.warehouse_id,
        notes: input.notes,
        created_by: Some(user.id()),
        items,
        total,
    };
    let detail = state.db.orders.create(&order).await?;

    log::info!(
        "purchase order {} created by {} ({} lines, total {})",
        detail.order.number,
        user.id(),
        detail.items.len(),
        detail.order.total
    );
    state
        .audit
        .record(
            user.id(),
            AuditAction::Crear,
            AuditEntity::OrdenCompra,
            detail.order.id,
            Some(json!({ "numero": detail.order.number, "total": detail.order.total })),
        )
        .await;

    Ok(Created(
        ApiResponse::ok(detail).with_message("Orden de compra creada"),
    ))
}

pub async fn update_order(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
    ValidatedJson(input): ValidatedJson<UpdatePurchaseOrder>,
) -> ApiResult<PurchaseOrderDetail> {
    let current = find_order(&state, id).await?;
    ensure_owner_or_manager(&user, &current.order)?;
    check_supplier(&state.db, input.supplier_id).await?;
    check_warehouse(&state.db, input.warehouse_id).await?;
    let items = match &input.items {
        Some(items) => {
            check_products(&state.db, &user, items).await?;
            Some(price_items(items)?)
        }
        None => None,
    };

    let changes = OrderChanges {
        supplier_id: input.supplier_id,
        warehouse_id: input.warehouse_id,
        notes: input.notes,
        items,
    };
    let detail = state.db.orders.update(id, &changes).await?;

    state
        .audit
        .record(
            user.id(),
            AuditAction::Actualizar,
            AuditEntity::OrdenCompra,
            id,
            Some(json!({ "total": detail.order.total })),
        )
        .await;

    Ok(ApiResponse::ok(detail).with_message("Orden de compra actualizada"))
}

pub async fn delete_order(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<()> {
    let current = find_order(&state, id).await?;
    ensure_owner_or_manager(&user, &current.order)?;
    if !state.db.orders.delete(id).await? {
        return Err(AppError::not_found("Orden de compra"));
    }

    log::info!("purchase order {} deleted by {}", current.order.number, user.id());
    state
        .audit
        .record(
            user.id(),
            AuditAction::Eliminar,
            AuditEntity::OrdenCompra,
            id,
            Some(json!({ "numero": current.order.number })),
        )
        .await;

    Ok(ApiResponse::message("Orden de compra eliminada"))
}

pub async fn approve_order(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<PurchaseOrder> {
    user.require_role(MANAGERS)?;
    let order = state.db.orders.approve(id, user.id()).await?;

    log::info!("purchase order {} approved by {}", order.number, user.id());
    state
        .audit
        .record(user.id(), AuditAction::Aprobar, AuditEntity::OrdenCompra, id, None)
        .await;

    Ok(ApiResponse::ok(order).with_message("Orden de compra aprobada"))
}

pub async fn reject_order(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
    ValidatedJson(input): ValidatedJson<RejectPurchaseOrder>,
) -> ApiResult<PurchaseOrder> {
    user.require_role(MANAGERS)?;
    if input.reason.trim().is_empty() {
        return Err(AppError::validation("El motivo de rechazo es obligatorio"));
    }
    let order = state.db.orders.reject(id, user.id(), &input.reason).await?;

    log::info!("purchase order {} rejected by {}", order.number, user.id());
    state
        .audit
        .record(
            user.id(),
            AuditAction::Rechazar,
            AuditEntity::OrdenCompra,
            id,
            Some(json!({ "motivo": order.rejection_reason })),
        )
        .await;

    Ok(ApiResponse::ok(order).with_message("Orden de compra rechazada"))
}

pub async fn complete_order(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<CompletedOrder> {
    let current = find_order(&state, id).await?;
    for item in &current.items {
        if let Some(product) = state.db.products.get(item.product_id).await? {
            user.ensure_product_access(&product)?;
        }
    }
    let (order, movements) = state.db.orders.complete(id, user.id()).await?;

    log::info!(
        "purchase order {} received by {} ({} movements)",
        order.number,
        user.id(),
        movements.len()
    );
    state
        .audit
        .record(
            user.id(),
            AuditAction::Completar,
            AuditEntity::OrdenCompra,
            id,
            Some(json!({
                "numero": order.number,
                "movimientos": movements.iter().map(|m| m.id).collect::<Vec<_>>(),
            })),
        )
        .await;

    Ok(ApiResponse::ok(CompletedOrder {
        orden: order,
        movimientos: movements,
    })
    .with_message("Orden de compra completada"))
}
