#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use inventory_pro::{
    config::{AppConfig, StorageKind},
    create_router,
    database::Database,
    models::{NewUser, User, UserRole, WarehouseInput},
    state::AppState,
    utils::{create_token, hash_password},
};

pub const PASSWORD: &str = "secreto123";

pub fn test_config() -> AppConfig {
    AppConfig {
        storage: StorageKind::Memory,
        database_url: None,
        host: "127.0.0.1".to_string(),
        port: 0,
        jwt_secret: "test-secret".to_string(),
        token_ttl_hours: 1,
        bcrypt_cost: 4,
        db_max_connections: 1,
        run_migrations: false,
        admin_email: None,
        admin_password: None,
    }
}

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub admin: User,
    pub supervisor: User,
    /// Operator assigned to `warehouse_id`.
    pub operator: User,
    pub warehouse_id: Uuid,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let state = AppState::new(Database::memory(), test_config());

        let warehouse = state
            .db
            .warehouses
            .create(&WarehouseInput {
                name: "Bodega Central".to_string(),
                location: Some("Santiago".to_string()),
                capacity: Some(1000),
                active: Some(true),
            })
            .await
            .unwrap();

        let admin = seed_user(&state, "Ana Admin", "admin@test.cl", UserRole::Admin, None).await;
        let supervisor =
            seed_user(&state, "Sergio Supervisor", "super@test.cl", UserRole::Supervisor, None).await;
        let operator = seed_user(
            &state,
            "Olga Operadora",
            "operador@test.cl",
            UserRole::Operador,
            Some(warehouse.id),
        )
        .await;

        let router = create_router(state.clone());
        Self {
            state,
            router,
            admin,
            supervisor,
            operator,
            warehouse_id: warehouse.id,
        }
    }

    pub fn token(&self, user: &User) -> String {
        create_token(user, &self.state.config.jwt_secret, 1).unwrap()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, user: &User) -> TestResponse {
        let token = self.token(user);
        self.request(Method::GET, uri, Some(&token), None).await
    }

    pub async fn post(&self, uri: &str, user: &User, body: Value) -> TestResponse {
        let token = self.token(user);
        self.request(Method::POST, uri, Some(&token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, user: &User, body: Value) -> TestResponse {
        let token = self.token(user);
        self.request(Method::PUT, uri, Some(&token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, user: &User, body: Option<Value>) -> TestResponse {
        let token = self.token(user);
        self.request(Method::PATCH, uri, Some(&token), body).await
    }

    pub async fn delete(&self, uri: &str, user: &User) -> TestResponse {
        let token = self.token(user);
        self.request(Method::DELETE, uri, Some(&token), None).await
    }

    /// Creates a product as the admin and returns its JSON.
    pub async fn create_product(&self, body: Value) -> Value {
        let res = self.post("/api/productos", &self.admin, body).await;
        assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
        res.data().clone()
    }

    pub async fn create_supplier(&self, name: &str) -> Value {
        let res = self
            .post(
                "/api/proveedores",
                &self.admin,
                serde_json::json!({ "nombre": name, "email": "ventas@proveedor.cl" }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
        res.data().clone()
    }
}

async fn seed_user(
    state: &AppState,
    name: &str,
    email: &str,
    role: UserRole,
    warehouse_id: Option<Uuid>,
) -> User {
    state
        .db
        .users
        .create(&NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: hash_password(PASSWORD, 4).unwrap(),
            role,
            active: true,
            warehouse_id,
        })
        .await
        .unwrap()
}

pub fn id_of(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}
