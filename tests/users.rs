mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;

use common::{id_of, TestApp, PASSWORD};

#[tokio::test]
async fn login_returns_token_and_sets_cookie() {
    let app = TestApp::spawn().await;
    let res = app
        .request(
            Method::POST,
            "/api/usuarios/login",
            None,
            Some(json!({ "email": "ADMIN@test.cl", "password": PASSWORD })),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK, "{:?}", res.body);
    assert_eq!(res.data()["usuario"]["email"], "admin@test.cl");
    assert_eq!(res.data()["usuario"]["rol"], "admin");
    assert!(res.data()["usuario"].get("password_hash").is_none());
    assert!(res.data()["usuario"]["ultimo_acceso"].is_string());

    let cookie = res.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("auth_token="));
    assert!(cookie.contains("HttpOnly"));

    let token = res.data()["token"].as_str().unwrap().to_string();
    let me = app
        .request(Method::GET, "/api/usuarios/me", Some(&token), None)
        .await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.data()["id"], app.admin.id.to_string());
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() {
    let app = TestApp::spawn().await;
    for body in [
        json!({ "email": "admin@test.cl", "password": "incorrecta" }),
        json!({ "email": "nadie@test.cl", "password": PASSWORD }),
    ] {
        let res = app
            .request(Method::POST, "/api/usuarios/login", None, Some(body))
            .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.body["success"], false);
    }
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = TestApp::spawn().await;
    let anonymous = app.request(Method::GET, "/api/productos", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let forged = app
        .request(Method::GET, "/api/productos", Some("not-a-token"), None)
        .await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cookie_session_is_accepted() {
    let app = TestApp::spawn().await;
    let request = Request::builder()
        .uri("/api/usuarios/me")
        .header(header::COOKIE, format!("auth_token={}", app.token(&app.supervisor)))
        .body(Body::empty())
        .unwrap();
    let res = app.send(request).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["rol"], "supervisor");
}

#[tokio::test]
async fn deactivated_users_lose_access() {
    let app = TestApp::spawn().await;
    let token = app.token(&app.operator);

    let res = app
        .patch(
            &format!("/api/usuarios/{}/estado", app.operator.id),
            &app.admin,
            Some(json!({ "activo": false })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{:?}", res.body);
    assert_eq!(res.data()["activo"], false);

    let me = app
        .request(Method::GET, "/api/usuarios/me", Some(&token), None)
        .await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);

    let login = app
        .request(
            Method::POST,
            "/api/usuarios/login",
            None,
            Some(json!({ "email": "operador@test.cl", "password": PASSWORD })),
        )
        .await;
    assert_eq!(login.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admins_manage_users() {
    let app = TestApp::spawn().await;

    let created = app
        .post(
            "/api/usuarios",
            &app.admin,
            json!({
                "nombre": "Pedro Bodega",
                "email": "Pedro@Test.cl",
                "password": "clave-segura",
                "rol": "operador",
                "bodega_id": app.warehouse_id,
            }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{:?}", created.body);
    assert_eq!(created.data()["email"], "pedro@test.cl");
    let uri = format!("/api/usuarios/{}", id_of(created.data()));

    let duplicate = app
        .post(
            "/api/usuarios",
            &app.admin,
            json!({ "nombre": "Otro", "email": "pedro@test.cl", "password": "clave-segura" }),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let promoted = app
        .put(&uri, &app.admin, json!({ "rol": "supervisor" }))
        .await;
    assert_eq!(promoted.data()["rol"], "supervisor");

    let login = app
        .request(
            Method::POST,
            "/api/usuarios/login",
            None,
            Some(json!({ "email": "pedro@test.cl", "password": "clave-segura" })),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);

    let deleted = app.delete(&uri, &app.admin).await;
    assert_eq!(deleted.status, StatusCode::OK);
}

#[tokio::test]
async fn user_administration_is_restricted() {
    let app = TestApp::spawn().await;

    let by_supervisor = app
        .post(
            "/api/usuarios",
            &app.supervisor,
            json!({ "nombre": "X", "email": "x@test.cl", "password": "123456" }),
        )
        .await;
    assert_eq!(by_supervisor.status, StatusCode::FORBIDDEN);

    let listing = app.get("/api/usuarios", &app.operator).await;
    assert_eq!(listing.status, StatusCode::FORBIDDEN);

    let own = app
        .get(&format!("/api/usuarios/{}", app.operator.id), &app.operator)
        .await;
    assert_eq!(own.status, StatusCode::OK);

    let self_delete = app
        .delete(&format!("/api/usuarios/{}", app.admin.id), &app.admin)
        .await;
    assert_eq!(self_delete.status, StatusCode::BAD_REQUEST);

    let short_password = app
        .post(
            "/api/usuarios",
            &app.admin,
            json!({ "nombre": "Y", "email": "y@test.cl", "password": "123" }),
        )
        .await;
    assert_eq!(short_password.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logins_are_audited() {
    let app = TestApp::spawn().await;
    app.request(
        Method::POST,
        "/api/usuarios/login",
        None,
        Some(json!({ "email": "super@test.cl", "password": PASSWORD })),
    )
    .await;

    let res = app.get("/api/auditoria?accion=login", &app.admin).await;
    assert_eq!(res.status, StatusCode::OK);
    let rows = res.data().as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["usuario_id"], app.supervisor.id.to_string());

    let denied = app.get("/api/auditoria", &app.operator).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
}
