use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::listing::{SortDirection, SortValue, Sortable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Crear,
    Actualizar,
    Eliminar,
    Aprobar,
    Rechazar,
    Completar,
    Movimiento,
    Login,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Crear => "crear",
            AuditAction::Actualizar => "actualizar",
            AuditAction::Eliminar => "eliminar",
            AuditAction::Aprobar => "aprobar",
            AuditAction::Rechazar => "rechazar",
            AuditAction::Completar => "completar",
            AuditAction::Movimiento => "movimiento",
            AuditAction::Login => "login",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEntity {
    Producto,
    Movimiento,
    Proveedor,
    Bodega,
    Usuario,
    OrdenCompra,
}

impl AuditEntity {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditEntity::Producto => "producto",
            AuditEntity::Movimiento => "movimiento",
            AuditEntity::Proveedor => "proveedor",
            AuditEntity::Bodega => "bodega",
            AuditEntity::Usuario => "usuario",
            AuditEntity::OrdenCompra => "orden_compra",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AuditEntry {
    pub id: Uuid,
    #[serde(rename = "usuario_id")]
    pub user_id: Option<Uuid>,
    #[serde(rename = "accion")]
    pub action: String,
    #[serde(rename = "entidad")]
    pub entity: String,
    #[serde(rename = "entidad_id")]
    pub entity_id: Option<Uuid>,
    #[serde(rename = "detalles")]
    pub details: Option<sqlx::types::Json<serde_json::Value>>,
    #[serde(rename = "fecha")]
    pub created_at: DateTime<Utc>,
}

impl Sortable for AuditEntry {
    const SORT_FIELDS: &'static [&'static str] = &["fecha", "accion", "entidad"];
    const DEFAULT_SORT: (&'static str, SortDirection) = ("fecha", SortDirection::Desc);

    fn sort_value(&self, field: &str) -> SortValue {
        match field {
            "fecha" => SortValue::Time(self.created_at),
            "accion" => SortValue::text(&self.action),
            "entidad" => SortValue::text(&self.entity),
            _ => SortValue::Missing,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub user_id: Option<Uuid>,
    pub action: AuditAction,
    pub entity: AuditEntity,
    pub entity_id: Option<Uuid>,
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditFilter {
    #[serde(rename = "usuario_id")]
    pub user_id: Option<Uuid>,
    #[serde(rename = "accion")]
    pub action: Option<String>,
    #[serde(rename = "entidad")]
    pub entity: Option<String>,
    #[serde(rename = "entidad_id")]
    pub entity_id: Option<Uuid>,
    #[serde(rename = "desde")]
    pub from: Option<NaiveDate>,
    #[serde(rename = "hasta")]
    pub to: Option<NaiveDate>,
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        let day = entry.created_at.date_naive();
        self.user_id.map_or(true, |id| entry.user_id == Some(id))
            && self.action.as_deref().map_or(true, |a| entry.action == a)
            && self.entity.as_deref().map_or(true, |e| entry.entity == e)
            && self.entity_id.map_or(true, |id| entry.entity_id == Some(id))
            && self.from.map_or(true, |from| day >= from)
            && self.to.map_or(true, |to| day <= to)
    }
}
