use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::{like_pattern, PgStore};
use crate::{
    database::ProductRepository,
    error::AppResult,
    models::{CreateProduct, Product, ProductChanges, ProductFilter},
};

#[async_trait]
impl ProductRepository for PgStore {
    async fn list(&self, filter: &ProductFilter) -> AppResult<Vec<Product>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM products WHERE TRUE");

        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = like_pattern(search);
            query
                .push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR code ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(category) = &filter.category {
            query.push(" AND LOWER(category) = LOWER(").push_bind(category.clone()).push(")");
        }
        if let Some(supplier_id) = filter.supplier_id {
            query.push(" AND supplier_id = ").push_bind(supplier_id);
        }
        if let Some(warehouse_id) = filter.warehouse_id {
            query.push(" AND warehouse_id = ").push_bind(warehouse_id);
        }
        match filter.low_stock {
            Some(true) => {
                query.push(" AND stock <= min_stock");
            }
            Some(false) => {
                query.push(" AND stock > min_stock");
            }
            None => {}
        }
        if let Some(active) = filter.active {
            query.push(" AND active = ").push_bind(active);
        }

        let products = query.build_query_as::<Product>().fetch_all(&self.pool).await?;
        Ok(products)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn create(&self, input: &CreateProduct) -> AppResult<Product> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                id, code, name, description, category, price, cost, stock,
                min_stock, max_stock, supplier_id, warehouse_id, active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.code.trim())
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(&input.category)
        .bind(input.price)
        .bind(input.cost)
        .bind(input.min_stock)
        .bind(input.max_stock)
        .bind(input.supplier_id)
        .bind(input.warehouse_id)
        .bind(input.active.unwrap_or(true))
        .fetch_one(&self.pool)
        .await?;

        Ok(product)
    }

    async fn update(&self, id: Uuid, changes: &ProductChanges) -> AppResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                code = COALESCE($2, code),
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                category = COALESCE($5, category),
                price = COALESCE($6, price),
                cost = COALESCE($7, cost),
                min_stock = COALESCE($8, min_stock),
                max_stock = COALESCE($9, max_stock),
                supplier_id = COALESCE($10, supplier_id),
                warehouse_id = COALESCE($11, warehouse_id),
                active = COALESCE($12, active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.code.as_deref().map(str::trim))
        .bind(changes.name.as_deref().map(str::trim))
        .bind(&changes.description)
        .bind(&changes.category)
        .bind(changes.price)
        .bind(changes.cost)
        .bind(changes.min_stock)
        .bind(changes.max_stock)
        .bind(changes.supplier_id)
        .bind(changes.warehouse_id)
        .bind(changes.active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
