mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{id_of, TestApp};

#[tokio::test]
async fn supplier_crud_round() {
    let app = TestApp::spawn().await;
    let created = app
        .post(
            "/api/proveedores",
            &app.supervisor,
            json!({
                "nombre": "  Maderas del Sur ",
                "rut": "76.123.456-7",
                "contacto": "Rosa Díaz",
                "email": "rosa@maderas.cl",
                "telefono": "+56 9 1234 5678",
            }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{:?}", created.body);
    assert_eq!(created.data()["nombre"], "Maderas del Sur");
    assert_eq!(created.data()["rut"], "76.123.456-7");
    assert_eq!(created.data()["activo"], true);
    let uri = format!("/api/proveedores/{}", id_of(created.data()));

    let updated = app
        .put(&uri, &app.admin, json!({ "telefono": "22 555 0000", "activo": false }))
        .await;
    assert_eq!(updated.status, StatusCode::OK, "{:?}", updated.body);
    assert_eq!(updated.data()["telefono"], "22 555 0000");
    assert_eq!(updated.data()["activo"], false);

    let listed = app.get("/api/proveedores?buscar=maderas", &app.operator).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.data().as_array().unwrap().len(), 1);

    let deleted = app.delete(&uri, &app.admin).await;
    assert_eq!(deleted.status, StatusCode::OK);
    let gone = app.get(&uri, &app.admin).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_rut_is_a_conflict() {
    let app = TestApp::spawn().await;
    let body = json!({ "nombre": "Uno", "rut": "77.000.111-2" });
    let first = app.post("/api/proveedores", &app.admin, body).await;
    assert_eq!(first.status, StatusCode::CREATED);

    let second = app
        .post(
            "/api/proveedores",
            &app.admin,
            json!({ "nombre": "Dos", "rut": "77.000.111-2" }),
        )
        .await;
    assert_eq!(second.status, StatusCode::CONFLICT);

    let other = app.create_supplier("Tres").await;
    let renamed = app
        .put(
            &format!("/api/proveedores/{}", id_of(&other)),
            &app.admin,
            json!({ "rut": "77.000.111-2" }),
        )
        .await;
    assert_eq!(renamed.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_supplier_payloads_are_rejected() {
    let app = TestApp::spawn().await;
    let bad_email = app
        .post(
            "/api/proveedores",
            &app.admin,
            json!({ "nombre": "Correo", "email": "no-es-correo" }),
        )
        .await;
    assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);

    let by_operator = app
        .post("/api/proveedores", &app.operator, json!({ "nombre": "Nope" }))
        .await;
    assert_eq!(by_operator.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn suppliers_with_orders_cannot_be_deleted() {
    let app = TestApp::spawn().await;
    let supplier = app.create_supplier("Con órdenes").await;
    let product = app
        .create_product(json!({ "codigo": "SUP-1", "nombre": "Tabla", "precio": 10 }))
        .await;
    let order = app
        .post(
            "/api/ordenes-compra",
            &app.admin,
            json!({
                "proveedor_id": supplier["id"],
                "items": [{ "producto_id": product["id"], "cantidad": 1, "precio_unitario": 10 }],
            }),
        )
        .await;
    assert_eq!(order.status, StatusCode::CREATED);

    let res = app
        .delete(&format!("/api/proveedores/{}", id_of(&supplier)), &app.admin)
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    let still_there = app
        .get(&format!("/api/proveedores/{}", id_of(&supplier)), &app.admin)
        .await;
    assert_eq!(still_there.status, StatusCode::OK);
}

#[tokio::test]
async fn supplier_products_and_unlinking_on_delete() {
    let app = TestApp::spawn().await;
    let supplier = app.create_supplier("Pinturas Norte").await;
    let linked = app
        .create_product(json!({
            "codigo": "PIN-1", "nombre": "Látex blanco", "precio": 15990,
            "proveedor_id": supplier["id"],
        }))
        .await;
    app.create_product(json!({ "codigo": "PIN-2", "nombre": "Sin proveedor", "precio": 1 }))
        .await;

    let uri = format!("/api/proveedores/{}/productos", id_of(&supplier));
    let products = app.get(&uri, &app.admin).await;
    assert_eq!(products.status, StatusCode::OK);
    let rows = products.data().as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["codigo"], "PIN-1");

    let deleted = app
        .delete(&format!("/api/proveedores/{}", id_of(&supplier)), &app.admin)
        .await;
    assert_eq!(deleted.status, StatusCode::OK);

    let product = app
        .get(&format!("/api/productos/{}", id_of(&linked)), &app.admin)
        .await;
    assert_eq!(product.status, StatusCode::OK);
    assert!(product.data()["proveedor_id"].is_null());

    let missing = app.get(&uri, &app.admin).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_supplier_on_product_is_a_bad_request() {
    let app = TestApp::spawn().await;
    let res = app
        .post(
            "/api/productos",
            &app.admin,
            json!({
                "codigo": "REF-1", "nombre": "Huérfano", "precio": 1,
                "proveedor_id": uuid::Uuid::new_v4(),
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}
