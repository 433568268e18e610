mod common;

use std::str::FromStr;

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::json;

use common::{id_of, TestApp};

fn decimal(value: &serde_json::Value) -> Decimal {
    Decimal::from_str(value.as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn create_product_books_opening_stock_as_a_movement() {
    let app = TestApp::spawn().await;

    let res = app
        .post(
            "/api/productos",
            &app.admin,
            json!({
                "codigo": "TAL-001",
                "nombre": "Taladro percutor",
                "categoria": "Herramientas",
                "precio": "45990.50",
                "costo": "30000",
                "stock": 12,
                "stock_minimo": 5,
                "bodega_id": app.warehouse_id,
            }),
        )
        .await;

    assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
    assert_eq!(res.body["success"], true);
    let product = res.data();
    assert_eq!(product["codigo"], "TAL-001");
    assert_eq!(product["nombre"], "Taladro percutor");
    assert_eq!(product["stock"], 12);
    assert_eq!(product["stock_minimo"], 5);
    assert_eq!(product["bajo_stock"], false);
    assert_eq!(decimal(&product["precio"]), Decimal::from_str("45990.50").unwrap());

    let history = app
        .get(&format!("/api/productos/{}/movimientos", id_of(product)), &app.admin)
        .await;
    assert_eq!(history.status, StatusCode::OK);
    let rows = history.data().as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["tipo"], "entrada");
    assert_eq!(rows[0]["stock_anterior"], 0);
    assert_eq!(rows[0]["stock_nuevo"], 12);
    assert_eq!(rows[0]["motivo"], "Stock inicial");
}

#[tokio::test]
async fn english_field_names_are_accepted() {
    let app = TestApp::spawn().await;
    let product = app
        .create_product(json!({ "code": "ENG-1", "name": "Martillo", "price": 9990, "min_stock": 2 }))
        .await;
    assert_eq!(product["codigo"], "ENG-1");
    assert_eq!(product["stock_minimo"], 2);
    assert_eq!(product["stock"], 0);
}

#[tokio::test]
async fn duplicate_code_is_a_conflict() {
    let app = TestApp::spawn().await;
    app.create_product(json!({ "codigo": "DUP-1", "nombre": "Uno", "precio": 100 }))
        .await;

    let res = app
        .post(
            "/api/productos",
            &app.admin,
            json!({ "codigo": "DUP-1", "nombre": "Dos", "precio": 200 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["success"], false);
}

#[tokio::test]
async fn invalid_payloads_are_rejected() {
    let app = TestApp::spawn().await;

    let missing_name = app
        .post("/api/productos", &app.admin, json!({ "codigo": "X-1", "nombre": "", "precio": 10 }))
        .await;
    assert_eq!(missing_name.status, StatusCode::BAD_REQUEST);
    assert!(missing_name.message().contains("nombre"), "{}", missing_name.message());

    let bad_bounds = app
        .post(
            "/api/productos",
            &app.admin,
            json!({ "codigo": "X-2", "nombre": "Caja", "precio": 10, "stock_minimo": 10, "stock_maximo": 5 }),
        )
        .await;
    assert_eq!(bad_bounds.status, StatusCode::BAD_REQUEST);

    let negative_price = app
        .post("/api/productos", &app.admin, json!({ "codigo": "X-3", "nombre": "Caja", "precio": -1 }))
        .await;
    assert_eq!(negative_price.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn operators_cannot_edit_the_catalog() {
    let app = TestApp::spawn().await;
    let res = app
        .post(
            "/api/productos",
            &app.operator,
            json!({ "codigo": "OP-1", "nombre": "No", "precio": 1 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn low_stock_route_lists_only_products_at_or_below_minimum() {
    let app = TestApp::spawn().await;
    app.create_product(json!({ "codigo": "LOW-1", "nombre": "Escaso", "precio": 1, "stock": 2, "stock_minimo": 5 }))
        .await;
    app.create_product(json!({ "codigo": "LOW-2", "nombre": "Justo", "precio": 1, "stock": 5, "stock_minimo": 5 }))
        .await;
    app.create_product(json!({ "codigo": "OK-1", "nombre": "Sobra", "precio": 1, "stock": 50, "stock_minimo": 5 }))
        .await;

    let res = app.get("/api/productos/bajo-stock", &app.supervisor).await;
    assert_eq!(res.status, StatusCode::OK);
    let codes: Vec<&str> = res
        .data()
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["codigo"].as_str().unwrap())
        .collect();
    assert_eq!(codes.len(), 2);
    assert!(codes.contains(&"LOW-1"));
    assert!(codes.contains(&"LOW-2"));

    let filtered = app.get("/api/productos?bajo_stock=true", &app.admin).await;
    assert_eq!(filtered.data().as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn list_sorts_and_pages() {
    let app = TestApp::spawn().await;
    for (code, price) in [("A-1", 300), ("A-2", 100), ("A-3", 200)] {
        app.create_product(json!({ "codigo": code, "nombre": code, "precio": price }))
            .await;
    }

    let res = app
        .get("/api/productos?orden=precio&dir=desc&pagina=1&por_pagina=2", &app.admin)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let codes: Vec<&str> = res
        .data()
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["codigo"].as_str().unwrap())
        .collect();
    assert_eq!(codes, ["A-1", "A-3"]);
    assert_eq!(res.body["meta"]["total"], 3);
    assert_eq!(res.body["meta"]["paginas"], 2);

    let search = app.get("/api/productos?buscar=a-2", &app.admin).await;
    assert_eq!(search.data().as_array().unwrap().len(), 1);

    let unknown = app.get("/api/productos?orden=color", &app.admin).await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_keeps_stock_and_checks_bounds() {
    let app = TestApp::spawn().await;
    let product = app
        .create_product(json!({ "codigo": "UPD-1", "nombre": "Sierra", "precio": 100, "stock": 7 }))
        .await;
    let uri = format!("/api/productos/{}", id_of(&product));

    let res = app
        .put(&uri, &app.supervisor, json!({ "nombre": "Sierra circular", "stock": 999 }))
        .await;
    assert_eq!(res.status, StatusCode::OK, "{:?}", res.body);
    assert_eq!(res.data()["nombre"], "Sierra circular");
    assert_eq!(res.data()["stock"], 7);

    let missing = app
        .put(
            &format!("/api/productos/{}", uuid::Uuid::new_v4()),
            &app.admin,
            json!({ "nombre": "x" }),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn products_with_history_cannot_be_deleted() {
    let app = TestApp::spawn().await;
    let stocked = app
        .create_product(json!({ "codigo": "DEL-1", "nombre": "Con historia", "precio": 1, "stock": 3 }))
        .await;
    let empty = app
        .create_product(json!({ "codigo": "DEL-2", "nombre": "Sin historia", "precio": 1 }))
        .await;

    let res = app
        .delete(&format!("/api/productos/{}", id_of(&stocked)), &app.admin)
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = app
        .delete(&format!("/api/productos/{}", id_of(&empty)), &app.admin)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let gone = app
        .get(&format!("/api/productos/{}", id_of(&empty)), &app.admin)
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_ids_answer_with_the_envelope() {
    let app = TestApp::spawn().await;
    let res = app.get("/api/productos/no-es-uuid", &app.admin).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["success"], false);
}
