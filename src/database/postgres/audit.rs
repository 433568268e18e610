use async_trait::async_trait;
use sqlx::{types::Json, Postgres, QueryBuilder};
use uuid::Uuid;

use super::PgStore;
use crate::{
    database::AuditRepository,
    error::AppResult,
    models::{AuditEntry, AuditFilter, NewAuditEntry},
};

#[async_trait]
impl AuditRepository for PgStore {
    async fn append(&self, entry: &NewAuditEntry) -> AppResult<AuditEntry> {
        let stored = sqlx::query_as::<_, AuditEntry>(
            r#"
            INSERT INTO audit_logs (id, user_id, action, entity, entity_id, details)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.user_id)
        .bind(entry.action.as_str())
        .bind(entry.entity.as_str())
        .bind(entry.entity_id)
        .bind(entry.details.clone().map(Json))
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }

    async fn list(&self, filter: &AuditFilter) -> AppResult<Vec<AuditEntry>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM audit_logs WHERE TRUE");

        if let Some(user_id) = filter.user_id {
            query.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(action) = &filter.action {
            query.push(" AND action = ").push_bind(action.clone());
        }
        if let Some(entity) = &filter.entity {
            query.push(" AND entity = ").push_bind(entity.clone());
        }
        if let Some(entity_id) = filter.entity_id {
            query.push(" AND entity_id = ").push_bind(entity_id);
        }
        if let Some(from) = filter.from {
            query.push(" AND created_at::date >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            query.push(" AND created_at::date <= ").push_bind(to);
        }

        let entries = query.build_query_as::<AuditEntry>().fetch_all(&self.pool).await?;
        Ok(entries)
    }
}
