use std::collections::HashMap;

use axum::{extract::State, response::Html};
use askama::Template;
use uuid::Uuid;

use super::{products::scoped_products, reports::{build_summary, Summary}};
use crate::{
    error::AppResult,
    extractors::QueryParams,
    filters,
    listing::{paginate, ListParams, PageMeta, SortDirection, DEFAULT_PAGE_SIZE},
    middleware::{CurrentUser, PanelUser},
    models::{
        MovementFilter, OrderFilter, OrderStatus, ProductFilter, ProductView, PurchaseOrder, User,
    },
    state::AppState,
};

const DASHBOARD_ROWS: usize = 10;
const LATEST_MOVEMENTS: u32 = 50;

#[derive(Template)]
#[template(path = "panel/dashboard.html")]
struct DashboardTemplate<'a> {
    user: &'a User,
    summary: Summary,
    low_stock: Vec<ProductView>,
    pending_orders: Vec<PurchaseOrder>,
}

#[derive(Template)]
#[template(path = "panel/products.html")]
struct ProductsTemplate<'a> {
    user: &'a User,
    products: Vec<ProductView>,
    meta: PageMeta,
    search: String,
    sort_query: String,
    prev_page: Option<u32>,
    next_page: Option<u32>,
}

#[derive(Template)]
#[template(path = "panel/movements.html")]
struct MovementsTemplate<'a> {
    user: &'a User,
    rows: Vec<MovementRow>,
}

struct MovementRow {
    date: String,
    product: String,
    kind: &'static str,
    quantity: i32,
    previous_stock: i32,
    new_stock: i32,
    reason: String,
}

pub async fn dashboard(State(state): State<AppState>, user: PanelUser) -> AppResult<Html<String>> {
    let current = CurrentUser::from(user);
    let (summary, mut low_stock) = build_summary(&state, &current).await?;
    low_stock.sort_by_key(|p| p.product.stock - p.product.min_stock);
    low_stock.truncate(DASHBOARD_ROWS);

    let pending = OrderFilter {
        status: Some(OrderStatus::Pendiente),
        ..Default::default()
    };
    let mut pending_orders = state.db.orders.list(&pending).await?;
    pending_orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    pending_orders.truncate(DASHBOARD_ROWS);

    let template = DashboardTemplate {
        user: &current.0,
        summary,
        low_stock,
        pending_orders,
    };
    Ok(Html(template.render()?))
}

pub async fn products(
    State(state): State<AppState>,
    user: PanelUser,
    QueryParams(filter): QueryParams<ProductFilter>,
    QueryParams(mut params): QueryParams<ListParams>,
) -> AppResult<Html<String>> {
    let current = CurrentUser::from(user);
    params.pagina = Some(params.pagina.unwrap_or(1));
    params.por_pagina = Some(params.por_pagina.unwrap_or(DEFAULT_PAGE_SIZE));

    let search = filter.search.clone().unwrap_or_default();
    let products = scoped_products(&state, &current, filter).await?;
    let (products, meta) = paginate(products, &params)?;

    let mut sort_query = format!("buscar={}", urlencoding::encode(&search));
    if let Some(orden) = &params.orden {
        sort_query.push_str(&format!("&orden={}", urlencoding::encode(orden)));
    }
    if params.dir == Some(SortDirection::Desc) {
        sort_query.push_str("&dir=desc");
    }

    let template = ProductsTemplate {
        user: &current.0,
        prev_page: (meta.pagina > 1).then(|| meta.pagina - 1),
        next_page: (meta.pagina < meta.paginas).then(|| meta.pagina + 1),
        products,
        meta,
        search,
        sort_query,
    };
    Ok(Html(template.render()?))
}

pub async fn movements(State(state): State<AppState>, user: PanelUser) -> AppResult<Html<String>> {
    let current = CurrentUser::from(user);
    let visible: HashMap<Uuid, String> = scoped_products(&state, &current, ProductFilter::default())
        .await?
        .into_iter()
        .map(|p| (p.product.id, format!("{} · {}", p.product.code, p.product.name)))
        .collect();

    let latest = ListParams {
        pagina: Some(1),
        por_pagina: Some(LATEST_MOVEMENTS),
        ..Default::default()
    };
    let movements: Vec<_> = state
        .db
        .movements
        .list(&MovementFilter::default())
        .await?
        .into_iter()
        .filter(|m| visible.contains_key(&m.product_id))
        .collect();
    let (movements, _) = paginate(movements, &latest)?;

    let rows = movements
        .into_iter()
        .map(|m| MovementRow {
            date: m.created_at.format("%Y-%m-%d %H:%M").to_string(),
            product: visible.get(&m.product_id).cloned().unwrap_or_default(),
            kind: m.movement_type.as_str(),
            quantity: m.quantity,
            previous_stock: m.previous_stock,
            new_stock: m.new_stock,
            reason: m.reason.unwrap_or_default(),
        })
        .collect();

    let template = MovementsTemplate {
        user: &current.0,
        rows,
    };
    Ok(Html(template.render()?))
}
