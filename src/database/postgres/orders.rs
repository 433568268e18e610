use async_trait::async_trait;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{movements::record_movement, PgStore};
use crate::{
    database::PurchaseOrderRepository,
    error::{AppError, AppResult},
    models::{
        Movement, MovementType, NewMovement, NewOrderItem, NewPurchaseOrder, OrderChanges,
        OrderFilter, OrderStatus, PurchaseOrder, PurchaseOrderDetail, PurchaseOrderItem,
    },
};

async fn load_items(conn: &mut PgConnection, order_id: Uuid) -> AppResult<Vec<PurchaseOrderItem>> {
    let items = sqlx::query_as::<_, PurchaseOrderItem>(
        "SELECT * FROM purchase_order_items WHERE order_id = $1 ORDER BY line_no",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

async fn insert_items(
    conn: &mut PgConnection,
    order_id: Uuid,
    items: &[NewOrderItem],
) -> AppResult<Vec<PurchaseOrderItem>> {
    let mut stored = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let row = sqlx::query_as::<_, PurchaseOrderItem>(
            r#"
            INSERT INTO purchase_order_items (id, order_id, line_no, product_id, quantity, unit_price, subtotal)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order_id)
        .bind(index as i32 + 1)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.subtotal)
        .fetch_one(&mut *conn)
        .await?;
        stored.push(row);
    }
    Ok(stored)
}

async fn lock_order(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<PurchaseOrder>> {
    let order = sqlx::query_as::<_, PurchaseOrder>(
        "SELECT * FROM purchase_orders WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(order)
}

impl PgStore {
    /// Explains why a guarded status update touched no rows.
    async fn transition_failure(&self, id: Uuid, next: OrderStatus) -> AppError {
        let current = sqlx::query_scalar::<_, OrderStatus>(
            "SELECT status FROM purchase_orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;

        match current {
            Ok(Some(status)) => match status.check_transition(next) {
                Err(err) => err,
                Ok(()) => AppError::conflict("La orden cambió de estado, intente nuevamente"),
            },
            Ok(None) => AppError::not_found("Orden de compra"),
            Err(err) => err.into(),
        }
    }
}

#[async_trait]
impl PurchaseOrderRepository for PgStore {
    async fn list(&self, filter: &OrderFilter) -> AppResult<Vec<PurchaseOrder>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM purchase_orders WHERE TRUE");

        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(supplier_id) = filter.supplier_id {
            query.push(" AND supplier_id = ").push_bind(supplier_id);
        }
        if let Some(warehouse_id) = filter.warehouse_id {
            query.push(" AND warehouse_id = ").push_bind(warehouse_id);
        }

        let orders = query.build_query_as::<PurchaseOrder>().fetch_all(&self.pool).await?;
        Ok(orders)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<PurchaseOrderDetail>> {
        let mut conn = self.pool.acquire().await?;
        let order = sqlx::query_as::<_, PurchaseOrder>("SELECT * FROM purchase_orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match order {
            Some(order) => {
                let items = load_items(&mut conn, order.id).await?;
                Ok(Some(PurchaseOrderDetail { order, items }))
            }
            None => Ok(None),
        }
    }

    async fn create(&self, order: &NewPurchaseOrder) -> AppResult<PurchaseOrderDetail> {
        let mut tx = self.pool.begin().await?;

        let header = sqlx::query_as::<_, PurchaseOrder>(
            r#"
            INSERT INTO purchase_orders (id, number, supplier_id, warehouse_id, status, total, notes, created_by)
            VALUES ($1, $2, $3, $4, 'pendiente', $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&order.number)
        .bind(order.supplier_id)
        .bind(order.warehouse_id)
        .bind(order.total)
        .bind(&order.notes)
        .bind(order.created_by)
        .fetch_one(&mut *tx)
        .await?;

        let items = insert_items(&mut tx, header.id, &order.items).await?;
        tx.commit().await?;

        Ok(PurchaseOrderDetail { order: header, items })
    }

    async fn update(&self, id: Uuid, changes: &OrderChanges) -> AppResult<PurchaseOrderDetail> {
        let mut tx = self.pool.begin().await?;

        let current = lock_order(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Orden de compra"))?;
        if !current.status.is_editable() {
            return Err(AppError::conflict(format!(
                "Solo se pueden editar órdenes pendientes (estado actual: {})",
                current.status
            )));
        }

        let new_total = changes.items.as_ref().map(|(_, total)| *total);
        let header = sqlx::query_as::<_, PurchaseOrder>(
            r#"
            UPDATE purchase_orders SET
                supplier_id = COALESCE($2, supplier_id),
                warehouse_id = COALESCE($3, warehouse_id),
                notes = COALESCE($4, notes),
                total = COALESCE($5, total),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.supplier_id)
        .bind(changes.warehouse_id)
        .bind(&changes.notes)
        .bind(new_total)
        .fetch_one(&mut *tx)
        .await?;

        let items = match &changes.items {
            Some((items, _)) => {
                sqlx::query("DELETE FROM purchase_order_items WHERE order_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                insert_items(&mut tx, id, items).await?
            }
            None => load_items(&mut tx, id).await?,
        };

        tx.commit().await?;
        Ok(PurchaseOrderDetail { order: header, items })
    }

    async fn approve(&self, id: Uuid, approved_by: Uuid) -> AppResult<PurchaseOrder> {
        let order = sqlx::query_as::<_, PurchaseOrder>(
            r#"
            UPDATE purchase_orders SET
                status = 'aprobada',
                approved_by = $2,
                approved_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status = 'pendiente'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(approved_by)
        .fetch_optional(&self.pool)
        .await?;

        match order {
            Some(order) => Ok(order),
            None => Err(self.transition_failure(id, OrderStatus::Aprobada).await),
        }
    }

    async fn reject(&self, id: Uuid, rejected_by: Uuid, reason: &str) -> AppResult<PurchaseOrder> {
        let order = sqlx::query_as::<_, PurchaseOrder>(
            r#"
            UPDATE purchase_orders SET
                status = 'rechazada',
                approved_by = $2,
                rejection_reason = $3,
                updated_at = NOW()
            WHERE id = $1 AND status = 'pendiente'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(rejected_by)
        .bind(reason.trim())
        .fetch_optional(&self.pool)
        .await?;

        match order {
            Some(order) => Ok(order),
            None => Err(self.transition_failure(id, OrderStatus::Rechazada).await),
        }
    }

    async fn complete(&self, id: Uuid, received_by: Uuid) -> AppResult<(PurchaseOrder, Vec<Movement>)> {
        let mut tx = self.pool.begin().await?;

        let current = lock_order(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Orden de compra"))?;
        current.status.check_transition(OrderStatus::Completada)?;

        let items = load_items(&mut tx, id).await?;
        let mut movements = Vec::with_capacity(items.len());
        for item in &items {
            let entry = NewMovement {
                product_id: item.product_id,
                movement_type: MovementType::Entrada,
                quantity: item.quantity,
                reason: Some(format!("Recepción orden {}", current.number)),
                reference: Some(current.number.clone()),
                user_id: Some(received_by),
            };
            movements.push(record_movement(&mut tx, &entry).await?);
        }

        let order = sqlx::query_as::<_, PurchaseOrder>(
            r#"
            UPDATE purchase_orders SET
                status = 'completada',
                received_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((order, movements))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let current = match lock_order(&mut tx, id).await? {
            Some(order) => order,
            None => return Ok(false),
        };
        if !current.status.is_deletable() {
            return Err(AppError::conflict(format!(
                "No se puede eliminar una orden en estado '{}'",
                current.status
            )));
        }

        sqlx::query("DELETE FROM purchase_orders WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }
}
