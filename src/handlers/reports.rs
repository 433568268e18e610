use std::collections::BTreeMap;

use axum::extract::State;
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::products::scoped_products;
use crate::{
    error::{AppError, AppResult},
    extractors::QueryParams,
    middleware::CurrentUser,
    models::{
        MovementFilter, MovementType, OrderFilter, OrderStatus, ProductFilter, ProductView,
        SupplierFilter, WarehouseFilter,
    },
    response::{ApiResponse, ApiResult},
    state::AppState,
};

/// Longest span the daily chart accepts.
pub const MAX_REPORT_DAYS: i64 = 366;
const DEFAULT_REPORT_DAYS: i64 = 30;

#[derive(Debug, Serialize)]
pub struct Summary {
    pub total_productos: usize,
    pub productos_activos: usize,
    pub productos_bajo_stock: usize,
    pub valor_inventario: Decimal,
    pub total_proveedores: usize,
    pub total_bodegas: usize,
    pub ordenes_pendientes: usize,
    pub ordenes_aprobadas: usize,
    pub movimientos_hoy: usize,
}

/// Dashboard numbers, shared with the panel.
pub(crate) async fn build_summary(state: &AppState, user: &CurrentUser) -> AppResult<(Summary, Vec<ProductView>)> {
    let products = scoped_products(state, user, ProductFilter::default()).await?;
    let active: Vec<&ProductView> = products.iter().filter(|p| p.product.active).collect();
    let low_stock: Vec<ProductView> = active
        .iter()
        .filter(|p| p.bajo_stock)
        .map(|p| (*p).clone())
        .collect();
    let stock_value = inventory_value(&active)?;

    let orders = state.db.orders.list(&OrderFilter::default()).await?;
    let count_status = |status: OrderStatus| orders.iter().filter(|o| o.status == status).count();

    let today = Utc::now().date_naive();
    let today_filter = MovementFilter {
        from: Some(today),
        to: Some(today),
        ..Default::default()
    };
    let movements_today = state.db.movements.list(&today_filter).await?.len();

    let summary = Summary {
        total_productos: products.len(),
        productos_activos: active.len(),
        productos_bajo_stock: low_stock.len(),
        valor_inventario: stock_value,
        total_proveedores: state.db.suppliers.list(&SupplierFilter::default()).await?.len(),
        total_bodegas: state.db.warehouses.list(&WarehouseFilter::default()).await?.len(),
        ordenes_pendientes: count_status(OrderStatus::Pendiente),
        ordenes_aprobadas: count_status(OrderStatus::Aprobada),
        movimientos_hoy: movements_today,
    };
    Ok((summary, low_stock))
}

fn inventory_value(products: &[&ProductView]) -> AppResult<Decimal> {
    products
        .iter()
        .try_fold(Decimal::ZERO, |acc, p| {
            p.product
                .stock_value()
                .and_then(|value| acc.checked_add(value))
        })
        .ok_or_else(|| AppError::internal("El valor del inventario excede el máximo representable"))
}

pub async fn summary(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Summary> {
    let (summary, _) = build_summary(&state, &user).await?;
    Ok(ApiResponse::ok(summary))
}

#[derive(Debug, Default, Deserialize)]
pub struct DateRange {
    pub desde: Option<NaiveDate>,
    pub hasta: Option<NaiveDate>,
}

impl DateRange {
    /// Fills the defaults (last 30 days) and checks the bounds.
    pub fn resolve(&self, today: NaiveDate) -> AppResult<(NaiveDate, NaiveDate)> {
        let to = self.hasta.unwrap_or(today);
        let from = self
            .desde
            .unwrap_or(to - Duration::days(DEFAULT_REPORT_DAYS - 1));
        if from > to {
            return Err(AppError::validation("'desde' no puede ser posterior a 'hasta'"));
        }
        if (to - from).num_days() + 1 > MAX_REPORT_DAYS {
            return Err(AppError::validation(format!(
                "El rango no puede superar {} días",
                MAX_REPORT_DAYS
            )));
        }
        Ok((from, to))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyMovements {
    pub fecha: NaiveDate,
    pub entrada: i64,
    pub salida: i64,
    pub ajuste: i64,
    pub devolucion: i64,
}

pub async fn daily_movements(
    State(state): State<AppState>,
    user: CurrentUser,
    QueryParams(range): QueryParams<DateRange>,
) -> ApiResult<Vec<DailyMovements>> {
    let (from, to) = range.resolve(Utc::now().date_naive())?;
    let filter = MovementFilter {
        from: Some(from),
        to: Some(to),
        ..Default::default()
    };
    let mut movements = state.db.movements.list(&filter).await?;

    if user.scoped_warehouse().is_some() {
        let visible: std::collections::HashSet<_> = scoped_products(&state, &user, ProductFilter::default())
            .await?
            .into_iter()
            .map(|p| p.product.id)
            .collect();
        movements.retain(|m| visible.contains(&m.product_id));
    }

    let mut days: BTreeMap<NaiveDate, DailyMovements> = from
        .iter_days()
        .take_while(|day| *day <= to)
        .map(|fecha| {
            (
                fecha,
                DailyMovements {
                    fecha,
                    entrada: 0,
                    salida: 0,
                    ajuste: 0,
                    devolucion: 0,
                },
            )
        })
        .collect();

    for movement in &movements {
        if let Some(day) = days.get_mut(&movement.created_at.date_naive()) {
            let quantity = i64::from(movement.quantity);
            match movement.movement_type {
                MovementType::Entrada => day.entrada += quantity,
                MovementType::Salida => day.salida += quantity,
                MovementType::Ajuste => day.ajuste += quantity,
                MovementType::Devolucion => day.devolucion += quantity,
            }
        }
    }

    Ok(ApiResponse::ok(days.into_values().collect()))
}
