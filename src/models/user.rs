use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::rbac::UserRole;
use crate::listing::{SortDirection, SortValue, Sortable};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(rename = "rol")]
    pub role: UserRole,
    #[serde(rename = "activo")]
    pub active: bool,
    #[serde(rename = "bodega_id")]
    pub warehouse_id: Option<Uuid>,
    #[serde(rename = "ultimo_acceso")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(rename = "fecha_creacion")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "fecha_actualizacion")]
    pub updated_at: DateTime<Utc>,
}

impl Sortable for User {
    const SORT_FIELDS: &'static [&'static str] =
        &["nombre", "email", "rol", "activo", "ultimo_acceso", "fecha_creacion"];
    const DEFAULT_SORT: (&'static str, SortDirection) = ("nombre", SortDirection::Asc);

    fn sort_value(&self, field: &str) -> SortValue {
        match field {
            "nombre" => SortValue::text(&self.name),
            "email" => SortValue::text(&self.email),
            "rol" => SortValue::text(self.role.as_str()),
            "activo" => SortValue::Bool(self.active),
            "ultimo_acceso" => self.last_login.map(SortValue::Time).unwrap_or(SortValue::Missing),
            "fecha_creacion" => SortValue::Time(self.created_at),
            _ => SortValue::Missing,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUser {
    #[serde(rename = "nombre", alias = "name")]
    #[validate(length(min = 1, max = 120, message = "El nombre es obligatorio"))]
    pub name: String,
    #[validate(email(message = "Email inválido"))]
    pub email: String,
    #[serde(alias = "contrasena")]
    #[validate(length(min = 6, message = "La contraseña debe tener al menos 6 caracteres"))]
    pub password: String,
    #[serde(rename = "rol", alias = "role", default)]
    pub role: UserRole,
    #[serde(rename = "bodega_id", alias = "warehouse_id")]
    pub warehouse_id: Option<Uuid>,
    #[serde(rename = "activo", alias = "active")]
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUser {
    #[serde(rename = "nombre", alias = "name")]
    #[validate(length(min = 1, max = 120, message = "El nombre no puede estar vacío"))]
    pub name: Option<String>,
    #[validate(email(message = "Email inválido"))]
    pub email: Option<String>,
    #[serde(alias = "contrasena")]
    #[validate(length(min = 6, message = "La contraseña debe tener al menos 6 caracteres"))]
    pub password: Option<String>,
    #[serde(rename = "rol", alias = "role")]
    pub role: Option<UserRole>,
    #[serde(rename = "bodega_id", alias = "warehouse_id")]
    pub warehouse_id: Option<Uuid>,
    #[serde(rename = "activo", alias = "active")]
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetUserActive {
    #[serde(rename = "activo", alias = "active")]
    pub active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "El email es obligatorio"))]
    pub email: String,
    #[serde(alias = "contrasena")]
    #[validate(length(min = 1, message = "La contraseña es obligatoria"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub usuario: User,
    pub token: String,
}

/// Row to insert; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub active: bool,
    pub warehouse_id: Option<Uuid>,
}

/// Column updates; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<UserRole>,
    pub active: Option<bool>,
    pub warehouse_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    #[serde(rename = "buscar")]
    pub search: Option<String>,
    #[serde(rename = "rol")]
    pub role: Option<UserRole>,
    #[serde(rename = "activo")]
    pub active: Option<bool>,
    #[serde(rename = "bodega_id")]
    pub warehouse_id: Option<Uuid>,
}
