use axum::extract::State;
use uuid::Uuid;

use super::list_page;
use crate::{
    extractors::{PathParam, QueryParams},
    listing::ListParams,
    middleware::CurrentUser,
    models::{AuditEntry, AuditFilter, MANAGERS},
    response::ApiResult,
    state::AppState,
};

pub async fn list_audit(
    State(state): State<AppState>,
    user: CurrentUser,
    QueryParams(filter): QueryParams<AuditFilter>,
    QueryParams(params): QueryParams<ListParams>,
) -> ApiResult<Vec<AuditEntry>> {
    user.require_role(MANAGERS)?;
    let entries = state.db.audit.list(&filter).await?;
    list_page(entries, &params)
}

/// Trail of one record, newest first unless `orden`/`dir` say otherwise.
pub async fn record_history(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam((entity, id)): PathParam<(String, Uuid)>,
    QueryParams(params): QueryParams<ListParams>,
) -> ApiResult<Vec<AuditEntry>> {
    user.require_role(MANAGERS)?;
    let filter = AuditFilter {
        entity: Some(entity),
        entity_id: Some(id),
        ..Default::default()
    };
    let entries = state.db.audit.list(&filter).await?;
    list_page(entries, &params)
}
