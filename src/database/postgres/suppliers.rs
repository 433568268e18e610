use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::{like_pattern, PgStore};
use crate::{
    database::SupplierRepository,
    error::AppResult,
    models::{Supplier, SupplierChanges, SupplierFilter, SupplierInput},
};

#[async_trait]
impl SupplierRepository for PgStore {
    async fn list(&self, filter: &SupplierFilter) -> AppResult<Vec<Supplier>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM suppliers WHERE TRUE");

        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = like_pattern(search);
            query
                .push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR tax_id ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(active) = filter.active {
            query.push(" AND active = ").push_bind(active);
        }

        let suppliers = query.build_query_as::<Supplier>().fetch_all(&self.pool).await?;
        Ok(suppliers)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(supplier)
    }

    async fn create(&self, input: &SupplierInput) -> AppResult<Supplier> {
        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            INSERT INTO suppliers (id, name, tax_id, contact_name, email, phone, address, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.name.trim())
        .bind(input.tax_id.as_deref().map(str::trim))
        .bind(&input.contact_name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(input.active.unwrap_or(true))
        .fetch_one(&self.pool)
        .await?;

        Ok(supplier)
    }

    async fn update(&self, id: Uuid, changes: &SupplierChanges) -> AppResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            UPDATE suppliers SET
                name = COALESCE($2, name),
                tax_id = COALESCE($3, tax_id),
                contact_name = COALESCE($4, contact_name),
                email = COALESCE($5, email),
                phone = COALESCE($6, phone),
                address = COALESCE($7, address),
                active = COALESCE($8, active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.name.as_deref().map(str::trim))
        .bind(changes.tax_id.as_deref().map(str::trim))
        .bind(&changes.contact_name)
        .bind(&changes.email)
        .bind(&changes.phone)
        .bind(&changes.address)
        .bind(changes.active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(supplier)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
