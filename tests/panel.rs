mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;

use common::{TestApp, PASSWORD};

fn page(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("auth_token={}", token));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::spawn().await;
    let res = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["status"], "ok");
}

#[tokio::test]
async fn panel_redirects_anonymous_visitors_to_login() {
    let app = TestApp::spawn().await;
    let res = app.send(page("/panel", None)).await;
    assert!(res.status.is_redirection());
    assert_eq!(res.headers[header::LOCATION], "/panel/login");

    let login = app.send(page("/panel/login", None)).await;
    assert_eq!(login.status, StatusCode::OK);
}

#[tokio::test]
async fn panel_pages_render_for_signed_in_users() {
    let app = TestApp::spawn().await;
    app.create_product(json!({ "codigo": "PAN-1", "nombre": "Panel", "precio": "1234.5", "stock": 1, "stock_minimo": 3 }))
        .await;
    let token = app.token(&app.admin);

    for uri in ["/panel", "/panel/productos?buscar=pan&orden=nombre", "/panel/movimientos"] {
        let res = app.send(page(uri, Some(&token))).await;
        assert_eq!(res.status, StatusCode::OK, "{}", uri);
        let content_type = res.headers[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/html"), "{}", content_type);
    }
}

#[tokio::test]
async fn panel_login_form_sets_the_session_cookie() {
    let app = TestApp::spawn().await;
    let form = |password: &str| {
        Request::builder()
            .method(Method::POST)
            .uri("/panel/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("email=admin%40test.cl&password={}", password)))
            .unwrap()
    };

    let ok = app.send(form(PASSWORD)).await;
    assert!(ok.status.is_redirection());
    assert_eq!(ok.headers[header::LOCATION], "/panel");
    assert!(ok.headers[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .starts_with("auth_token="));

    let wrong = app.send(form("mala")).await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn reports_summarize_the_inventory() {
    let app = TestApp::spawn().await;
    app.create_product(json!({ "codigo": "REP-1", "nombre": "Uno", "precio": 100, "stock": 2, "stock_minimo": 5 }))
        .await;
    app.create_product(json!({ "codigo": "REP-2", "nombre": "Dos", "precio": 50, "stock": 10 }))
        .await;

    let summary = app.get("/api/reportes/resumen", &app.supervisor).await;
    assert_eq!(summary.status, StatusCode::OK);
    assert_eq!(summary.data()["total_productos"], 2);
    assert_eq!(summary.data()["productos_bajo_stock"], 1);
    assert_eq!(summary.data()["valor_inventario"], "700");
    assert_eq!(summary.data()["total_bodegas"], 1);
    assert_eq!(summary.data()["movimientos_hoy"], 2);

    let daily = app.get("/api/reportes/movimientos-diarios", &app.admin).await;
    assert_eq!(daily.status, StatusCode::OK);
    let days = daily.data().as_array().unwrap();
    assert_eq!(days.len(), 30);
    assert_eq!(days[29]["entrada"], 12);

    let inverted = app
        .get("/api/reportes/movimientos-diarios?desde=2024-02-01&hasta=2024-01-01", &app.admin)
        .await;
    assert_eq!(inverted.status, StatusCode::BAD_REQUEST);
}
