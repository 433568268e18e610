use axum::{
    extract::DefaultBodyLimit,
    response::Redirect,
    routing::{get, patch, post},
    Router,
};
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{handlers, state::AppState};

const BODY_LIMIT: usize = 2 * 1024 * 1024;

fn api_routes() -> Router<AppState> {
    use handlers::*;

    Router::new()
        // Session
        .route("/usuarios/login", post(auth::api_login))
        .route("/usuarios/logout", post(auth::api_logout))
        .route("/usuarios/me", get(users::me))
        // Users
        .route("/usuarios", get(users::list_users).post(users::create_user))
        .route(
            "/usuarios/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/usuarios/:id/estado", patch(users::set_user_active))
        // Catalog
        .route(
            "/productos",
            get(products::list_products).post(products::create_product),
        )
        .route("/productos/bajo-stock", get(products::low_stock_products))
        .route(
            "/productos/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/productos/:id/movimientos", get(products::product_movements))
        .route(
            "/movimientos",
            get(movements::list_movements).post(movements::create_movement),
        )
        .route("/movimientos/:id", get(movements::get_movement))
        .route(
            "/proveedores",
            get(suppliers::list_suppliers).post(suppliers::create_supplier),
        )
        .route(
            "/proveedores/:id",
            get(suppliers::get_supplier)
                .put(suppliers::update_supplier)
                .delete(suppliers::delete_supplier),
        )
        .route("/proveedores/:id/productos", get(suppliers::supplier_products))
        .route(
            "/bodegas",
            get(warehouses::list_warehouses).post(warehouses::create_warehouse),
        )
        .route(
            "/bodegas/:id",
            get(warehouses::get_warehouse)
                .put(warehouses::update_warehouse)
                .delete(warehouses::delete_warehouse),
        )
        .route("/bodegas/:id/productos", get(warehouses::warehouse_products))
        // Purchasing
        .route(
            "/ordenes-compra",
            get(purchase_orders::list_orders).post(purchase_orders::create_order),
        )
        .route(
            "/ordenes-compra/:id",
            get(purchase_orders::get_order)
                .put(purchase_orders::update_order)
                .delete(purchase_orders::delete_order),
        )
        .route("/ordenes-compra/:id/aprobar", patch(purchase_orders::approve_order))
        .route("/ordenes-compra/:id/rechazar", patch(purchase_orders::reject_order))
        .route("/ordenes-compra/:id/completar", patch(purchase_orders::complete_order))
        // Audit and reports
        .route("/auditoria", get(audit::list_audit))
        .route("/auditoria/:entidad/:id", get(audit::record_history))
        .route("/reportes/resumen", get(reports::summary))
        .route("/reportes/movimientos-diarios", get(reports::daily_movements))
}

fn panel_routes() -> Router<AppState> {
    use handlers::{auth, panel};

    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/", get(panel::dashboard))
        .route("/productos", get(panel::products))
        .route("/movimientos", get(panel::movements))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to("/panel") }))
        .route("/health", get(handlers::health))
        .nest("/api", api_routes())
        .nest("/panel", panel_routes())
        .nest_service("/static", ServeDir::new("static"))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(BODY_LIMIT)),
        )
        .with_state(state)
}
