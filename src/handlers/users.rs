use axum::extract::State;
use serde_json::json;
use uuid::Uuid;

use super::{check_warehouse, list_page};
use crate::{
    error::{AppError, AppResult},
    extractors::{PathParam, QueryParams, ValidatedJson},
    listing::ListParams,
    middleware::CurrentUser,
    models::{
        AuditAction, AuditEntity, CreateUser, NewUser, SetUserActive, UpdateUser, User,
        UserChanges, UserFilter, ADMINS, MANAGERS,
    },
    response::{ApiResponse, ApiResult, Created},
    state::AppState,
    utils::hash_password,
};

pub async fn me(user: CurrentUser) -> ApiResult<User> {
    Ok(ApiResponse::ok(user.0))
}

pub async fn list_users(
    State(state): State<AppState>,
    user: CurrentUser,
    QueryParams(filter): QueryParams<UserFilter>,
    QueryParams(params): QueryParams<ListParams>,
) -> ApiResult<Vec<User>> {
    user.require_role(MANAGERS)?;
    let users = state.db.users.list(&filter).await?;
    list_page(users, &params)
}

pub async fn get_user(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<User> {
    if id != user.id() {
        user.require_role(MANAGERS)?;
    }
    let found = state
        .db
        .users
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Usuario"))?;
    Ok(ApiResponse::ok(found))
}

pub async fn create_user(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(input): ValidatedJson<CreateUser>,
) -> AppResult<Created<User>> {
    user.require_role(ADMINS)?;
    check_warehouse(&state.db, input.warehouse_id).await?;

    let new_user = NewUser {
        name: input.name,
        email: input.email,
        password_hash: hash_password(&input.password, state.config.bcrypt_cost)?,
        role: input.role,
        active: input.active.unwrap_or(true),
        warehouse_id: input.warehouse_id,
    };
    let created = state.db.users.create(&new_user).await?;

    log::info!("user {} ({}) created by {}", created.email, created.id, user.id());
    state
        .audit
        .record(
            user.id(),
            AuditAction::Crear,
            AuditEntity::Usuario,
            created.id,
            Some(json!({ "email": created.email, "rol": created.role })),
        )
        .await;

    Ok(Created(ApiResponse::ok(created).with_message("Usuario creado")))
}

pub async fn update_user(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
    ValidatedJson(input): ValidatedJson<UpdateUser>,
) -> ApiResult<User> {
    user.require_role(ADMINS)?;
    if id == user.id() && input.active == Some(false) {
        return Err(AppError::BadRequest("No puede desactivar su propio usuario".into()));
    }
    check_warehouse(&state.db, input.warehouse_id).await?;

    let password_hash = match &input.password {
        Some(password) => Some(hash_password(password, state.config.bcrypt_cost)?),
        None => None,
    };
    let changes = UserChanges {
        name: input.name,
        email: input.email,
        password_hash,
        role: input.role,
        active: input.active,
        warehouse_id: input.warehouse_id,
    };
    let updated = state
        .db
        .users
        .update(id, &changes)
        .await?
        .ok_or_else(|| AppError::not_found("Usuario"))?;

    state
        .audit
        .record(
            user.id(),
            AuditAction::Actualizar,
            AuditEntity::Usuario,
            id,
            Some(json!({ "cambio_contrasena": changes.password_hash.is_some() })),
        )
        .await;

    Ok(ApiResponse::ok(updated).with_message("Usuario actualizado"))
}

pub async fn set_user_active(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
    ValidatedJson(SetUserActive { active }): ValidatedJson<SetUserActive>,
) -> ApiResult<User> {
    user.require_role(ADMINS)?;
    if id == user.id() && !active {
        return Err(AppError::BadRequest("No puede desactivar su propio usuario".into()));
    }

    let changes = UserChanges {
        active: Some(active),
        ..Default::default()
    };
    let updated = state
        .db
        .users
        .update(id, &changes)
        .await?
        .ok_or_else(|| AppError::not_found("Usuario"))?;

    state
        .audit
        .record(
            user.id(),
            AuditAction::Actualizar,
            AuditEntity::Usuario,
            id,
            Some(json!({ "activo": active })),
        )
        .await;

    let message = if active { "Usuario activado" } else { "Usuario desactivado" };
    Ok(ApiResponse::ok(updated).with_message(message))
}

pub async fn delete_user(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<()> {
    user.require_role(ADMINS)?;
    if id == user.id() {
        return Err(AppError::BadRequest("No puede eliminar su propio usuario".into()));
    }
    if !state.db.users.delete(id).await? {
        return Err(AppError::not_found("Usuario"));
    }

    log::info!("user {} deleted by {}", id, user.id());
    state
        .audit
        .record(user.id(), AuditAction::Eliminar, AuditEntity::Usuario, id, None)
        .await;

    Ok(ApiResponse::message("Usuario eliminado"))
}
