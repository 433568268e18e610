use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::{
    database::AuditRepository,
    models::{AuditAction, AuditEntity, NewAuditEntry},
};

/// Writes the audit trail after a mutation has been committed.
///
/// Recording is best effort: a failed write is logged and never turns a
/// successful request into an error.
#[derive(Clone)]
pub struct AuditLogger {
    repo: Arc<dyn AuditRepository>,
}

impl AuditLogger {
    pub fn new(repo: Arc<dyn AuditRepository>) -> Self {
        Self { repo }
    }

    pub async fn record(
        &self,
        user_id: Uuid,
        action: AuditAction,
        entity: AuditEntity,
        entity_id: Uuid,
        details: Option<Value>,
    ) {
        let entry = NewAuditEntry {
            user_id: Some(user_id),
            action,
            entity,
            entity_id: Some(entity_id),
            details,
        };

        if let Err(e) = self.repo.append(&entry).await {
            log::warn!(
                "audit write failed ({} {} {}): {}",
                action.as_str(),
                entity.as_str(),
                entity_id,
                e
            );
        }
    }
}
