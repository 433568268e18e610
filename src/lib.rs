pub mod audit;
pub mod config;
pub mod database;
pub mod error;
pub mod extractors;
pub mod filters;
pub mod handlers;
pub mod listing;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod state;
pub mod utils;

pub use routes::create_router;

use crate::{
    error::AppResult,
    models::{NewUser, UserRole},
    state::AppState,
    utils::hash_password,
};

/// Creates the first administrator from `ADMIN_EMAIL`/`ADMIN_PASSWORD`
/// when the user table is empty.
pub async fn seed_admin(state: &AppState) -> AppResult<()> {
    if state.db.users.count().await? > 0 {
        return Ok(());
    }
    let (Some(email), Some(password)) = (&state.config.admin_email, &state.config.admin_password)
    else {
        log::warn!("no users exist and ADMIN_EMAIL/ADMIN_PASSWORD are not set");
        return Ok(());
    };

    let admin = NewUser {
        name: "Administrador".to_string(),
        email: email.clone(),
        password_hash: hash_password(password, state.config.bcrypt_cost)?,
        role: UserRole::Admin,
        active: true,
        warehouse_id: None,
    };
    let user = state.db.users.create(&admin).await?;
    log::info!("seeded administrator {}", user.email);
    Ok(())
}
