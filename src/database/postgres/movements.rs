use async_trait::async_trait;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use uuid::Uuid;

use super::PgStore;
use crate::{
    database::MovementRepository,
    error::{AppError, AppResult},
    models::{Movement, MovementFilter, NewMovement},
};

/// Locks the product row, applies the movement and appends the ledger row.
/// Runs on the caller's transaction.
pub(super) async fn record_movement(
    conn: &mut PgConnection,
    movement: &NewMovement,
) -> AppResult<Movement> {
    let current: Option<i32> =
        sqlx::query_scalar("SELECT stock FROM products WHERE id = $1 FOR UPDATE")
            .bind(movement.product_id)
            .fetch_optional(&mut *conn)
            .await?;
    let current = current.ok_or_else(|| AppError::not_found("Producto"))?;
    let new_stock = movement.movement_type.apply(current, movement.quantity)?;

    sqlx::query("UPDATE products SET stock = $2, updated_at = NOW() WHERE id = $1")
        .bind(movement.product_id)
        .bind(new_stock)
        .execute(&mut *conn)
        .await?;

    let recorded = sqlx::query_as::<_, Movement>(
        r#"
        INSERT INTO movements (
            id, product_id, movement_type, quantity, previous_stock, new_stock,
            reason, reference, user_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(movement.product_id)
    .bind(movement.movement_type)
    .bind(movement.quantity)
    .bind(current)
    .bind(new_stock)
    .bind(&movement.reason)
    .bind(&movement.reference)
    .bind(movement.user_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(recorded)
}

#[async_trait]
impl MovementRepository for PgStore {
    async fn list(&self, filter: &MovementFilter) -> AppResult<Vec<Movement>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM movements WHERE TRUE");

        if let Some(movement_type) = filter.movement_type {
            query.push(" AND movement_type = ").push_bind(movement_type);
        }
        if let Some(product_id) = filter.product_id {
            query.push(" AND product_id = ").push_bind(product_id);
        }
        if let Some(user_id) = filter.user_id {
            query.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(reference) = &filter.reference {
            query.push(" AND reference = ").push_bind(reference.clone());
        }
        if let Some(from) = filter.from {
            query.push(" AND created_at::date >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            query.push(" AND created_at::date <= ").push_bind(to);
        }

        let movements = query.build_query_as::<Movement>().fetch_all(&self.pool).await?;
        Ok(movements)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Movement>> {
        let movement = sqlx::query_as::<_, Movement>("SELECT * FROM movements WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(movement)
    }

    async fn record(&self, movement: &NewMovement) -> AppResult<Movement> {
        let mut tx = self.pool.begin().await?;
        let recorded = record_movement(&mut *tx, movement).await?;
        tx.commit().await?;
        Ok(recorded)
    }
}
