use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    listing::{SortDirection, SortValue, Sortable},
};

// ---------------------------------------------------------------------------
// Suppliers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Supplier {
    pub id: Uuid,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "rut")]
    pub tax_id: Option<String>,
    #[serde(rename = "contacto")]
    pub contact_name: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "telefono")]
    pub phone: Option<String>,
    #[serde(rename = "direccion")]
    pub address: Option<String>,
    #[serde(rename = "activo")]
    pub active: bool,
    #[serde(rename = "fecha_creacion")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "fecha_actualizacion")]
    pub updated_at: DateTime<Utc>,
}

impl Sortable for Supplier {
    const SORT_FIELDS: &'static [&'static str] = &["nombre", "rut", "contacto", "activo", "fecha_creacion"];
    const DEFAULT_SORT: (&'static str, SortDirection) = ("nombre", SortDirection::Asc);

    fn sort_value(&self, field: &str) -> SortValue {
        match field {
            "nombre" => SortValue::text(&self.name),
            "rut" => SortValue::opt_text(self.tax_id.as_deref()),
            "contacto" => SortValue::opt_text(self.contact_name.as_deref()),
            "activo" => SortValue::Bool(self.active),
            "fecha_creacion" => SortValue::Time(self.created_at),
            _ => SortValue::Missing,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SupplierInput {
    #[serde(rename = "nombre", alias = "name")]
    #[validate(length(min = 1, max = 200, message = "El nombre del proveedor es obligatorio"))]
    pub name: String,
    #[serde(rename = "rut", alias = "tax_id")]
    #[validate(length(min = 1, max = 20, message = "RUT inválido"))]
    pub tax_id: Option<String>,
    #[serde(rename = "contacto", alias = "contact_name")]
    pub contact_name: Option<String>,
    #[validate(email(message = "Email inválido"))]
    pub email: Option<String>,
    #[serde(rename = "telefono", alias = "phone")]
    pub phone: Option<String>,
    #[serde(rename = "direccion", alias = "address")]
    pub address: Option<String>,
    #[serde(rename = "activo", alias = "active")]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SupplierChanges {
    #[serde(rename = "nombre", alias = "name")]
    #[validate(length(min = 1, max = 200, message = "El nombre del proveedor no puede estar vacío"))]
    pub name: Option<String>,
    #[serde(rename = "rut", alias = "tax_id")]
    #[validate(length(min = 1, max = 20, message = "RUT inválido"))]
    pub tax_id: Option<String>,
    #[serde(rename = "contacto", alias = "contact_name")]
    pub contact_name: Option<String>,
    #[validate(email(message = "Email inválido"))]
    pub email: Option<String>,
    #[serde(rename = "telefono", alias = "phone")]
    pub phone: Option<String>,
    #[serde(rename = "direccion", alias = "address")]
    pub address: Option<String>,
    #[serde(rename = "activo", alias = "active")]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupplierFilter {
    #[serde(rename = "buscar")]
    pub search: Option<String>,
    #[serde(rename = "activo")]
    pub active: Option<bool>,
}

// ---------------------------------------------------------------------------
// Purchase orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pendiente,
    Aprobada,
    Rechazada,
    Completada,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pendiente => "pendiente",
            OrderStatus::Aprobada => "aprobada",
            OrderStatus::Rechazada => "rechazada",
            OrderStatus::Completada => "completada",
        }
    }

    /// pendiente → aprobada | rechazada, aprobada → completada.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pendiente, OrderStatus::Aprobada)
                | (OrderStatus::Pendiente, OrderStatus::Rechazada)
                | (OrderStatus::Aprobada, OrderStatus::Completada)
        )
    }

    pub fn check_transition(self, next: OrderStatus) -> AppResult<()> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(AppError::conflict(format!(
                "No se puede pasar una orden '{}' a '{}'",
                self, next
            )))
        }
    }

    /// The source state a transition into `next` must start from.
    pub fn source_of(next: OrderStatus) -> Option<OrderStatus> {
        match next {
            OrderStatus::Aprobada | OrderStatus::Rechazada => Some(OrderStatus::Pendiente),
            OrderStatus::Completada => Some(OrderStatus::Aprobada),
            OrderStatus::Pendiente => None,
        }
    }

    pub fn is_editable(self) -> bool {
        self == OrderStatus::Pendiente
    }

    pub fn is_deletable(self) -> bool {
        matches!(self, OrderStatus::Pendiente | OrderStatus::Rechazada)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PurchaseOrder {
    pub id: Uuid,
    #[serde(rename = "numero")]
    pub number: String,
    #[serde(rename = "proveedor_id")]
    pub supplier_id: Uuid,
    #[serde(rename = "bodega_id")]
    pub warehouse_id: Option<Uuid>,
    #[serde(rename = "estado")]
    pub status: OrderStatus,
    pub total: Decimal,
    #[serde(rename = "notas")]
    pub notes: Option<String>,
    #[serde(rename = "creado_por")]
    pub created_by: Option<Uuid>,
    #[serde(rename = "aprobado_por")]
    pub approved_by: Option<Uuid>,
    #[serde(rename = "motivo_rechazo")]
    pub rejection_reason: Option<String>,
    #[serde(rename = "fecha_aprobacion")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(rename = "fecha_recepcion")]
    pub received_at: Option<DateTime<Utc>>,
    #[serde(rename = "fecha_creacion")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "fecha_actualizacion")]
    pub updated_at: DateTime<Utc>,
}

impl PurchaseOrder {
    /// `OC-YYYYMMDD-XXXXXX`, the suffix taken from a fresh v4 uuid.
    pub fn generate_number(now: DateTime<Utc>) -> String {
        let suffix = Uuid::new_v4().simple().to_string()[..6].to_uppercase();
        format!("OC-{}-{}", now.format("%Y%m%d"), suffix)
    }
}

impl Sortable for PurchaseOrder {
    const SORT_FIELDS: &'static [&'static str] = &["numero", "estado", "total", "fecha_creacion"];
    const DEFAULT_SORT: (&'static str, SortDirection) = ("fecha_creacion", SortDirection::Desc);

    fn sort_value(&self, field: &str) -> SortValue {
        match field {
            "numero" => SortValue::text(&self.number),
            "estado" => SortValue::text(self.status.as_str()),
            "total" => SortValue::Decimal(self.total),
            "fecha_creacion" => SortValue::Time(self.created_at),
            _ => SortValue::Missing,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PurchaseOrderItem {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub order_id: Uuid,
    #[serde(skip_serializing)]
    pub line_no: i32,
    #[serde(rename = "producto_id")]
    pub product_id: Uuid,
    #[serde(rename = "cantidad")]
    pub quantity: i32,
    #[serde(rename = "precio_unitario")]
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseOrderDetail {
    #[serde(flatten)]
    pub order: PurchaseOrder,
    pub items: Vec<PurchaseOrderItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderItemInput {
    #[serde(rename = "producto_id", alias = "product_id")]
    pub product_id: Uuid,
    #[serde(rename = "cantidad", alias = "quantity")]
    #[validate(range(min = 1, message = "La cantidad de cada ítem debe ser mayor a 0"))]
    pub quantity: i32,
    #[serde(rename = "precio_unitario", alias = "unit_price")]
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePurchaseOrder {
    #[serde(rename = "proveedor_id", alias = "supplier_id")]
    pub supplier_id: Uuid,
    #[serde(rename = "bodega_id", alias = "warehouse_id")]
    pub warehouse_id: Option<Uuid>,
    #[serde(rename = "notas", alias = "notes")]
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "La orden debe tener al menos un ítem"), nested)]
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePurchaseOrder {
    #[serde(rename = "proveedor_id", alias = "supplier_id")]
    pub supplier_id: Option<Uuid>,
    #[serde(rename = "bodega_id", alias = "warehouse_id")]
    pub warehouse_id: Option<Uuid>,
    #[serde(rename = "notas", alias = "notes")]
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "La orden debe tener al menos un ítem"), nested)]
    pub items: Option<Vec<OrderItemInput>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RejectPurchaseOrder {
    #[serde(rename = "motivo", alias = "reason")]
    #[validate(length(min = 1, max = 500, message = "El motivo de rechazo es obligatorio"))]
    pub reason: String,
}

/// Priced line ready to store.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// Prices the lines and totals them. Unit prices must not be negative.
fn amount_overflow() -> AppError {
    AppError::validation("El monto de la orden excede el máximo permitido")
}

pub fn price_items(items: &[OrderItemInput]) -> AppResult<(Vec<NewOrderItem>, Decimal)> {
    let mut priced = Vec::with_capacity(items.len());
    let mut total = Decimal::ZERO;
    for item in items {
        if item.unit_price.is_sign_negative() && !item.unit_price.is_zero() {
            return Err(AppError::validation("El precio unitario no puede ser negativo"));
        }
        let subtotal = item
            .unit_price
            .checked_mul(Decimal::from(item.quantity))
            .ok_or_else(amount_overflow)?;
        total = total.checked_add(subtotal).ok_or_else(amount_overflow)?;
        priced.push(NewOrderItem {
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            subtotal,
        });
    }
    Ok((priced, total))
}

#[derive(Debug, Clone)]
pub struct NewPurchaseOrder {
    pub number: String,
    pub supplier_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub items: Vec<NewOrderItem>,
    pub total: Decimal,
}

/// Header and line changes for an order that is still `pendiente`.
#[derive(Debug, Clone, Default)]
pub struct OrderChanges {
    pub supplier_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub notes: Option<String>,
    pub items: Option<(Vec<NewOrderItem>, Decimal)>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    #[serde(rename = "estado")]
    pub status: Option<OrderStatus>,
    #[serde(rename = "proveedor_id")]
    pub supplier_id: Option<Uuid>,
    #[serde(rename = "bodega_id")]
    pub warehouse_id: Option<Uuid>,
}

impl OrderFilter {
    pub fn matches(&self, order: &PurchaseOrder) -> bool {
        self.status.map_or(true, |s| order.status == s)
            && self.supplier_id.map_or(true, |id| order.supplier_id == id)
            && self.warehouse_id.map_or(true, |id| order.warehouse_id == Some(id))
    }
}
