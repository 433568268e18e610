use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use askama::Template;
use chrono::Utc;
use serde::Deserialize;
use tower_cookies::{Cookie, Cookies};

use crate::{
    error::{AppError, AppResult},
    extractors::ValidatedJson,
    middleware::AUTH_COOKIE,
    models::{AuditAction, AuditEntity, LoginRequest, LoginResponse, User},
    response::{ApiResponse, ApiResult},
    state::AppState,
    utils::{create_token, verify_password},
};

#[derive(Template)]
#[template(path = "panel/login.html")]
struct LoginTemplate {
    error: Option<String>,
    email: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    email: String,
    password: String,
}

/// Checks the credentials, stamps the login and issues a token.
async fn authenticate_user(state: &AppState, email: &str, password: &str) -> AppResult<(User, String)> {
    let mut user = match state.db.users.find_by_email(email).await? {
        Some(user) if user.active && verify_password(password, &user.password_hash) => user,
        _ => {
            log::info!("failed login for {}", email.trim());
            return Err(AppError::InvalidCredentials);
        }
    };

    let token = create_token(&user, &state.config.jwt_secret, state.config.token_ttl_hours)?;
    state.db.users.record_login(user.id).await?;
    user.last_login = Some(Utc::now());

    log::info!("user {} logged in", user.id);
    state
        .audit
        .record(user.id, AuditAction::Login, AuditEntity::Usuario, user.id, None)
        .await;

    Ok((user, token))
}

fn set_auth_cookie(cookies: &Cookies, token: String, ttl_hours: i64) {
    let cookie = Cookie::build((AUTH_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(tower_cookies::cookie::SameSite::Lax)
        .max_age(time::Duration::hours(ttl_hours))
        .build();

    cookies.add(cookie);
}

fn clear_auth_cookie(cookies: &Cookies) {
    let mut cookie = Cookie::from(AUTH_COOKIE);
    cookie.set_path("/");
    cookies.remove(cookie);
}

pub async fn api_login(
    State(state): State<AppState>,
    cookies: Cookies,
    ValidatedJson(input): ValidatedJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let (user, token) = authenticate_user(&state, &input.email, &input.password).await?;
    set_auth_cookie(&cookies, token.clone(), state.config.token_ttl_hours);

    Ok(ApiResponse::ok(LoginResponse { usuario: user, token }).with_message("Sesión iniciada"))
}

pub async fn api_logout(cookies: Cookies) -> ApiResult<()> {
    clear_auth_cookie(&cookies);
    Ok(ApiResponse::message("Sesión cerrada"))
}

pub async fn login_page() -> AppResult<Html<String>> {
    let template = LoginTemplate {
        error: None,
        email: String::new(),
    };
    Ok(Html(template.render()?))
}

pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    match authenticate_user(&state, &form.email, &form.password).await {
        Ok((_, token)) => {
            set_auth_cookie(&cookies, token, state.config.token_ttl_hours);
            Ok(Redirect::to("/panel").into_response())
        }
        Err(AppError::InvalidCredentials) => {
            let template = LoginTemplate {
                error: Some(AppError::InvalidCredentials.to_string()),
                email: form.email,
            };
            Ok((StatusCode::UNAUTHORIZED, Html(template.render()?)).into_response())
        }
        Err(e) => Err(e),
    }
}

pub async fn logout(cookies: Cookies) -> impl IntoResponse {
    clear_auth_cookie(&cookies);
    Redirect::to("/panel/login")
}
