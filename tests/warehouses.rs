mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{id_of, TestApp};

#[tokio::test]
async fn warehouse_crud_round() {
    let app = TestApp::spawn().await;
    let created = app
        .post(
            "/api/bodegas",
            &app.admin,
            json!({ "nombre": "Bodega Norte", "ubicacion": "Antofagasta", "capacidad": 500 }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{:?}", created.body);
    assert_eq!(created.data()["nombre"], "Bodega Norte");
    assert_eq!(created.data()["capacidad"], 500);
    let uri = format!("/api/bodegas/{}", id_of(created.data()));

    let updated = app
        .put(&uri, &app.supervisor, json!({ "capacidad": 750, "ubicacion": "Calama" }))
        .await;
    assert_eq!(updated.status, StatusCode::OK, "{:?}", updated.body);
    assert_eq!(updated.data()["capacidad"], 750);
    assert_eq!(updated.data()["ubicacion"], "Calama");
    assert_eq!(updated.data()["nombre"], "Bodega Norte");

    let listed = app.get("/api/bodegas?orden=nombre", &app.admin).await;
    let names: Vec<&str> = listed
        .data()
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["nombre"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Bodega Central", "Bodega Norte"]);

    let deleted = app.delete(&uri, &app.admin).await;
    assert_eq!(deleted.status, StatusCode::OK);
    let gone = app.get(&uri, &app.admin).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    let again = app.delete(&uri, &app.admin).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn warehouse_writes_are_validated_and_restricted() {
    let app = TestApp::spawn().await;
    let negative = app
        .post("/api/bodegas", &app.admin, json!({ "nombre": "Mala", "capacidad": -1 }))
        .await;
    assert_eq!(negative.status, StatusCode::BAD_REQUEST);

    let by_operator = app
        .put(
            &format!("/api/bodegas/{}", app.warehouse_id),
            &app.operator,
            json!({ "nombre": "Mía" }),
        )
        .await;
    assert_eq!(by_operator.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deleting_a_warehouse_unlinks_products_and_users() {
    let app = TestApp::spawn().await;
    let product = app
        .create_product(json!({
            "codigo": "BOD-1", "nombre": "Estante", "precio": 1, "stock": 3,
            "bodega_id": app.warehouse_id,
        }))
        .await;

    let listed = app
        .get(&format!("/api/bodegas/{}/productos", app.warehouse_id), &app.operator)
        .await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.data().as_array().unwrap().len(), 1);

    let deleted = app
        .delete(&format!("/api/bodegas/{}", app.warehouse_id), &app.admin)
        .await;
    assert_eq!(deleted.status, StatusCode::OK, "{:?}", deleted.body);

    let unlinked = app
        .get(&format!("/api/productos/{}", id_of(&product)), &app.admin)
        .await;
    assert!(unlinked.data()["bodega_id"].is_null());
    assert_eq!(unlinked.data()["stock"], 3);

    let operator = app
        .get(&format!("/api/usuarios/{}", app.operator.id), &app.admin)
        .await;
    assert!(operator.data()["bodega_id"].is_null());
}
