use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::{like_pattern, PgStore};
use crate::{
    database::WarehouseRepository,
    error::AppResult,
    models::{Warehouse, WarehouseChanges, WarehouseFilter, WarehouseInput},
};

#[async_trait]
impl WarehouseRepository for PgStore {
    async fn list(&self, filter: &WarehouseFilter) -> AppResult<Vec<Warehouse>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM warehouses WHERE TRUE");

        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = like_pattern(search);
            query
                .push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR location ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(active) = filter.active {
            query.push(" AND active = ").push_bind(active);
        }

        let warehouses = query.build_query_as::<Warehouse>().fetch_all(&self.pool).await?;
        Ok(warehouses)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Warehouse>> {
        let warehouse = sqlx::query_as::<_, Warehouse>("SELECT * FROM warehouses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(warehouse)
    }

    async fn create(&self, input: &WarehouseInput) -> AppResult<Warehouse> {
        let warehouse = sqlx::query_as::<_, Warehouse>(
            r#"
            INSERT INTO warehouses (id, name, location, capacity, active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.name.trim())
        .bind(&input.location)
        .bind(input.capacity)
        .bind(input.active.unwrap_or(true))
        .fetch_one(&self.pool)
        .await?;

        Ok(warehouse)
    }

    async fn update(&self, id: Uuid, changes: &WarehouseChanges) -> AppResult<Option<Warehouse>> {
        let warehouse = sqlx::query_as::<_, Warehouse>(
            r#"
            UPDATE warehouses SET
                name = COALESCE($2, name),
                location = COALESCE($3, location),
                capacity = COALESCE($4, capacity),
                active = COALESCE($5, active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.name.as_deref().map(str::trim))
        .bind(&changes.location)
        .bind(changes.capacity)
        .bind(changes.active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(warehouse)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM warehouses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
