use chrono::{DateTime, NaiveDate, Utc};
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
// Warehouses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Warehouse {
    pub id: Uuid,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "ubicacion")]
    pub location: Option<String>,
    #[serde(rename = "capacidad")]
    pub capacity: Option<i32>,
    #[serde(rename = "activo")]
    pub active: bool,
    #[serde(rename = "fecha_creacion")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "fecha_actualizacion")]
    pub updated_at: DateTime<Utc>,
}

impl Sortable for Warehouse {
    const SORT_FIELDS: &'static [&'static str] =
        &["nombre", "ubicacion", "capacidad", "activo", "fecha_creacion"];
    const DEFAULT_SORT: (&'static str, SortDirection) = ("nombre", SortDirection::Asc);

    fn sort_value(&self, field: &str) -> SortValue {
        match field {
            "nombre" => SortValue::text(&self.name),
            "ubicacion" => SortValue::opt_text(self.location.as_deref()),
            "capacidad" => self
                .capacity
                .map(|c| SortValue::Int(c.into()))
                .unwrap_or(SortValue::Missing),
            "activo" => SortValue::Bool(self.active),
            "fecha_creacion" => SortValue::Time(self.created_at),
            _ => SortValue::Missing,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WarehouseInput {
    #[serde(rename = "nombre", alias = "name")]
    #[validate(length(min = 1, max = 120, message = "El nombre de la bodega es obligatorio"))]
    pub name: String,
    #[serde(rename = "ubicacion", alias = "location")]
    pub location: Option<String>,
    #[serde(rename = "capacidad", alias = "capacity")]
    #[validate(range(min = 0, message = "La capacidad no puede ser negativa"))]
    pub capacity: Option<i32>,
    #[serde(rename = "activo", alias = "active")]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct WarehouseChanges {
    #[serde(rename = "nombre", alias = "name")]
    #[validate(length(min = 1, max = 120, message = "El nombre de la bodega no puede estar vacío"))]
    pub name: Option<String>,
    #[serde(rename = "ubicacion", alias = "location")]
    pub location: Option<String>,
    #[serde(rename = "capacidad", alias = "capacity")]
    #[validate(range(min = 0, message = "La capacidad no puede ser negativa"))]
    pub capacity: Option<i32>,
    #[serde(rename = "activo", alias = "active")]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WarehouseFilter {
    #[serde(rename = "buscar")]
    pub search: Option<String>,
    #[serde(rename = "activo")]
    pub active: Option<bool>,
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "categoria")]
    pub category: Option<String>,
    #[serde(rename = "precio")]
    pub price: Decimal,
    #[serde(rename = "costo")]
    pub cost: Option<Decimal>,
    pub stock: i32,
    #[serde(rename = "stock_minimo")]
    pub min_stock: i32,
    #[serde(rename = "stock_maximo")]
    pub max_stock: Option<i32>,
    #[serde(rename = "proveedor_id")]
    pub supplier_id: Option<Uuid>,
    #[serde(rename = "bodega_id")]
    pub warehouse_id: Option<Uuid>,
    #[serde(rename = "activo")]
    pub active: bool,
    #[serde(rename = "fecha_creacion")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "fecha_actualizacion")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }

    /// `None` when price times stock does not fit in a decimal.
    pub fn stock_value(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.stock))
    }
}

impl Sortable for Product {
    const SORT_FIELDS: &'static [&'static str] = &[
        "codigo",
        "nombre",
        "categoria",
        "precio",
        "stock",
        "stock_minimo",
        "fecha_creacion",
        "fecha_actualizacion",
    ];
    const DEFAULT_SORT: (&'static str, SortDirection) = ("nombre", SortDirection::Asc);

    fn sort_value(&self, field: &str) -> SortValue {
        match field {
            "codigo" => SortValue::text(&self.code),
            "nombre" => SortValue::text(&self.name),
            "categoria" => SortValue::opt_text(self.category.as_deref()),
            "precio" => SortValue::Decimal(self.price),
            "stock" => SortValue::Int(self.stock.into()),
            "stock_minimo" => SortValue::Int(self.min_stock.into()),
            "fecha_creacion" => SortValue::Time(self.created_at),
            "fecha_actualizacion" => SortValue::Time(self.updated_at),
            _ => SortValue::Missing,
        }
    }
}

/// Product as the API returns it, with the low-stock flag computed.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub bajo_stock: bool,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        Self {
            bajo_stock: product.is_low_stock(),
            product,
        }
    }
}

impl Sortable for ProductView {
    const SORT_FIELDS: &'static [&'static str] = Product::SORT_FIELDS;
    const DEFAULT_SORT: (&'static str, SortDirection) = Product::DEFAULT_SORT;

    fn sort_value(&self, field: &str) -> SortValue {
        self.product.sort_value(field)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProduct {
    #[serde(rename = "codigo", alias = "code")]
    #[validate(length(min = 1, max = 60, message = "El código es obligatorio"))]
    pub code: String,
    #[serde(rename = "nombre", alias = "name")]
    #[validate(length(min = 1, max = 200, message = "El nombre es obligatorio"))]
    pub name: String,
    #[serde(rename = "descripcion", alias = "description")]
    pub description: Option<String>,
    #[serde(rename = "categoria", alias = "category")]
    pub category: Option<String>,
    #[serde(rename = "precio", alias = "price")]
    pub price: Decimal,
    #[serde(rename = "costo", alias = "cost")]
    pub cost: Option<Decimal>,
    /// Opening stock, booked as an `entrada` movement.
    #[serde(default)]
    #[validate(range(min = 0, message = "El stock inicial no puede ser negativo"))]
    pub stock: i32,
    #[serde(rename = "stock_minimo", alias = "min_stock", default)]
    #[validate(range(min = 0, message = "El stock mínimo no puede ser negativo"))]
    pub min_stock: i32,
    #[serde(rename = "stock_maximo", alias = "max_stock")]
    #[validate(range(min = 0, message = "El stock máximo no puede ser negativo"))]
    pub max_stock: Option<i32>,
    #[serde(rename = "proveedor_id", alias = "supplier_id")]
    pub supplier_id: Option<Uuid>,
    #[serde(rename = "bodega_id", alias = "warehouse_id")]
    pub warehouse_id: Option<Uuid>,
    #[serde(rename = "activo", alias = "active")]
    pub active: Option<bool>,
}

impl CreateProduct {
    pub fn check(&self) -> AppResult<()> {
        check_prices(Some(self.price), self.cost)?;
        check_stock_bounds(self.min_stock, self.max_stock)
    }
}

/// Catalog update. Stock is absent on purpose: it only moves through movements.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProductChanges {
    #[serde(rename = "codigo", alias = "code")]
    #[validate(length(min = 1, max = 60, message = "El código no puede estar vacío"))]
    pub code: Option<String>,
    #[serde(rename = "nombre", alias = "name")]
    #[validate(length(min = 1, max = 200, message = "El nombre no puede estar vacío"))]
    pub name: Option<String>,
    #[serde(rename = "descripcion", alias = "description")]
    pub description: Option<String>,
    #[serde(rename = "categoria", alias = "category")]
    pub category: Option<String>,
    #[serde(rename = "precio", alias = "price")]
    pub price: Option<Decimal>,
    #[serde(rename = "costo", alias = "cost")]
    pub cost: Option<Decimal>,
    #[serde(rename = "stock_minimo", alias = "min_stock")]
    #[validate(range(min = 0, message = "El stock mínimo no puede ser negativo"))]
    pub min_stock: Option<i32>,
    #[serde(rename = "stock_maximo", alias = "max_stock")]
    #[validate(range(min = 0, message = "El stock máximo no puede ser negativo"))]
    pub max_stock: Option<i32>,
    #[serde(rename = "proveedor_id", alias = "supplier_id")]
    pub supplier_id: Option<Uuid>,
    #[serde(rename = "bodega_id", alias = "warehouse_id")]
    pub warehouse_id: Option<Uuid>,
    #[serde(rename = "activo", alias = "active")]
    pub active: Option<bool>,
}

impl ProductChanges {
    /// Checks the update against the row it will be applied to.
    pub fn check(&self, current: &Product) -> AppResult<()> {
        check_prices(self.price, self.cost)?;
        check_stock_bounds(
            self.min_stock.unwrap_or(current.min_stock),
            self.max_stock.or(current.max_stock),
        )
    }
}

fn check_prices(price: Option<Decimal>, cost: Option<Decimal>) -> AppResult<()> {
    if price.is_some_and(|p| p.is_sign_negative() && !p.is_zero()) {
        return Err(AppError::validation("El precio no puede ser negativo"));
    }
    if cost.is_some_and(|c| c.is_sign_negative() && !c.is_zero()) {
        return Err(AppError::validation("El costo no puede ser negativo"));
    }
    Ok(())
}

fn check_stock_bounds(min_stock: i32, max_stock: Option<i32>) -> AppResult<()> {
    match max_stock {
        Some(max) if max < min_stock => Err(AppError::validation(
            "El stock máximo debe ser mayor o igual al stock mínimo",
        )),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    #[serde(rename = "buscar")]
    pub search: Option<String>,
    #[serde(rename = "categoria")]
    pub category: Option<String>,
    #[serde(rename = "proveedor_id")]
    pub supplier_id: Option<Uuid>,
    #[serde(rename = "bodega_id")]
    pub warehouse_id: Option<Uuid>,
    #[serde(rename = "bajo_stock")]
    pub low_stock: Option<bool>,
    #[serde(rename = "activo")]
    pub active: Option<bool>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            if !product.name.to_lowercase().contains(&needle)
                && !product.code.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if !product
                .category
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(category))
            {
                return false;
            }
        }
        if self.supplier_id.is_some() && product.supplier_id != self.supplier_id {
            return false;
        }
        if self.warehouse_id.is_some() && product.warehouse_id != self.warehouse_id {
            return false;
        }
        if let Some(low) = self.low_stock {
            if product.is_low_stock() != low {
                return false;
            }
        }
        if let Some(active) = self.active {
            if product.active != active {
                return false;
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Movements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "movement_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Entrada,
    Salida,
    Ajuste,
    Devolucion,
}

impl MovementType {
    pub const ALL: [MovementType; 4] = [
        MovementType::Entrada,
        MovementType::Salida,
        MovementType::Ajuste,
        MovementType::Devolucion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MovementType::Entrada => "entrada",
            MovementType::Salida => "salida",
            MovementType::Ajuste => "ajuste",
            MovementType::Devolucion => "devolucion",
        }
    }

    /// Stock after applying a movement of `quantity` units to `current`.
    ///
    /// `ajuste` records a physical count, so the quantity becomes the new
    /// stock. Every other type is relative and needs at least one unit.
    pub fn apply(self, current: i32, quantity: i32) -> AppResult<i32> {
        if quantity < 0 {
            return Err(AppError::validation("La cantidad no puede ser negativa"));
        }
        if quantity == 0 && self != MovementType::Ajuste {
            return Err(AppError::validation("La cantidad debe ser mayor a 0"));
        }

        match self {
            MovementType::Entrada | MovementType::Devolucion => current
                .checked_add(quantity)
                .ok_or_else(|| AppError::validation("La cantidad excede el máximo permitido")),
            MovementType::Salida => {
                if quantity > current {
                    Err(AppError::InsufficientStock(format!(
                        "Stock insuficiente: disponible {}, solicitado {}",
                        current, quantity
                    )))
                } else {
                    Ok(current - quantity)
                }
            }
            MovementType::Ajuste => Ok(quantity),
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Movement {
    pub id: Uuid,
    #[serde(rename = "producto_id")]
    pub product_id: Uuid,
    #[serde(rename = "tipo")]
    pub movement_type: MovementType,
    #[serde(rename = "cantidad")]
    pub quantity: i32,
    #[serde(rename = "stock_anterior")]
    pub previous_stock: i32,
    #[serde(rename = "stock_nuevo")]
    pub new_stock: i32,
    #[serde(rename = "motivo")]
    pub reason: Option<String>,
    #[serde(rename = "referencia")]
    pub reference: Option<String>,
    #[serde(rename = "usuario_id")]
    pub user_id: Option<Uuid>,
    #[serde(rename = "fecha")]
    pub created_at: DateTime<Utc>,
}

impl Sortable for Movement {
    const SORT_FIELDS: &'static [&'static str] = &["fecha", "tipo", "cantidad", "stock_nuevo"];
    const DEFAULT_SORT: (&'static str, SortDirection) = ("fecha", SortDirection::Desc);

    fn sort_value(&self, field: &str) -> SortValue {
        match field {
            "fecha" => SortValue::Time(self.created_at),
            "tipo" => SortValue::text(self.movement_type.as_str()),
            "cantidad" => SortValue::Int(self.quantity.into()),
            "stock_nuevo" => SortValue::Int(self.new_stock.into()),
            _ => SortValue::Missing,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMovement {
    #[serde(rename = "producto_id", alias = "product_id")]
    pub product_id: Uuid,
    #[serde(rename = "tipo", alias = "type")]
    pub movement_type: MovementType,
    #[serde(rename = "cantidad", alias = "quantity")]
    #[validate(range(min = 0, message = "La cantidad no puede ser negativa"))]
    pub quantity: i32,
    #[serde(rename = "motivo", alias = "reason")]
    #[validate(length(max = 500, message = "El motivo es demasiado largo"))]
    pub reason: Option<String>,
    #[serde(rename = "referencia", alias = "reference")]
    pub reference: Option<String>,
}

/// Ledger row to record. The store computes the stock columns.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub product_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: i32,
    pub reason: Option<String>,
    pub reference: Option<String>,
    pub user_id: Option<Uuid>,
}

impl NewMovement {
    pub fn from_request(input: CreateMovement, user_id: Uuid) -> Self {
        Self {
            product_id: input.product_id,
            movement_type: input.movement_type,
            quantity: input.quantity,
            reason: input.reason,
            reference: input.reference,
            user_id: Some(user_id),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementFilter {
    #[serde(rename = "tipo")]
    pub movement_type: Option<MovementType>,
    #[serde(rename = "producto_id")]
    pub product_id: Option<Uuid>,
    #[serde(rename = "usuario_id")]
    pub user_id: Option<Uuid>,
    #[serde(rename = "referencia")]
    pub reference: Option<String>,
    #[serde(rename = "desde")]
    pub from: Option<NaiveDate>,
    #[serde(rename = "hasta")]
    pub to: Option<NaiveDate>,
}

impl MovementFilter {
    pub fn matches(&self, movement: &Movement) -> bool {
        let day = movement.created_at.date_naive();
        self.movement_type.map_or(true, |t| movement.movement_type == t)
            && self.product_id.map_or(true, |id| movement.product_id == id)
            && self.user_id.map_or(true, |id| movement.user_id == Some(id))
            && self
                .reference
                .as_deref()
                .map_or(true, |r| movement.reference.as_deref() == Some(r))
            && self.from.map_or(true, |from| day >= from)
            && self.to.map_or(true, |to| day <= to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn entrada_and_devolucion_add_units() {
        assert_eq!(MovementType::Entrada.apply(10, 5).unwrap(), 15);
        assert_eq!(MovementType::Devolucion.apply(0, 3).unwrap(), 3);
    }

    #[test]
    fn salida_never_goes_negative() {
        assert_eq!(MovementType::Salida.apply(10, 10).unwrap(), 0);
        let err = MovementType::Salida.apply(4, 5).unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock(_)));
        assert!(err.to_string().contains("disponible 4"));
    }

    #[test]
    fn ajuste_sets_the_counted_stock() {
        assert_eq!(MovementType::Ajuste.apply(40, 12).unwrap(), 12);
        assert_eq!(MovementType::Ajuste.apply(40, 0).unwrap(), 0);
    }

    #[test]
    fn relative_movements_need_a_positive_quantity() {
        assert!(MovementType::Entrada.apply(1, 0).is_err());
        assert!(MovementType::Salida.apply(1, -1).is_err());
        assert!(MovementType::Entrada.apply(i32::MAX, 1).is_err());
    }

    fn product(stock: i32, min_stock: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            code: "TOR-001".into(),
            name: "Tornillo hexagonal".into(),
            description: None,
            category: Some("Ferretería".into()),
            price: Decimal::from_str("12.50").unwrap(),
            cost: None,
            stock,
            min_stock,
            max_stock: None,
            supplier_id: None,
            warehouse_id: None,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn low_stock_includes_the_minimum() {
        assert!(product(5, 5).is_low_stock());
        assert!(!product(6, 5).is_low_stock());
        assert_eq!(product(4, 0).stock_value(), Some(Decimal::from_str("50.00").unwrap()));
    }

    #[test]
    fn product_serializes_spanish_names() {
        let view = ProductView::from(product(2, 5));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["codigo"], "TOR-001");
        assert_eq!(json["precio"], "12.50");
        assert_eq!(json["stock_minimo"], 5);
        assert_eq!(json["bajo_stock"], true);
        assert!(json.get("code").is_none());
    }

    #[test]
    fn filter_matches_search_and_category() {
        let p = product(10, 2);
        let by_code = ProductFilter {
            search: Some("tor-0".into()),
            ..Default::default()
        };
        assert!(by_code.matches(&p));

        let other_category = ProductFilter {
            category: Some("Pinturas".into()),
            ..Default::default()
        };
        assert!(!other_category.matches(&p));

        let low = ProductFilter {
            low_stock: Some(true),
            ..Default::default()
        };
        assert!(!low.matches(&p));
    }

    #[test]
    fn stock_bounds_are_checked_against_the_current_row() {
        let p = product(10, 5);
        let changes = ProductChanges {
            max_stock: Some(3),
            ..Default::default()
        };
        assert!(changes.check(&p).is_err());

        let negative_price = ProductChanges {
            price: Some(Decimal::from(-1)),
            ..Default::default()
        };
        assert!(negative_price.check(&p).is_err());
    }
}
