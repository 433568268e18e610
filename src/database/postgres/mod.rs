mod audit;
mod movements;
mod orders;
mod products;
mod suppliers;
mod users;
mod warehouses;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use super::HealthCheck;
use crate::error::AppResult;

/// Repository implementations over a Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub async fn create_database_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    // Test the connection
    sqlx::query("SELECT 1").execute(&pool).await?;

    log::info!("connected to database");
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    log::info!("database migrations applied");
    Ok(())
}

/// `%term%` for ILIKE searches.
fn like_pattern(term: &str) -> String {
    format!("%{}%", term.trim())
}

#[async_trait]
impl HealthCheck for PgStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
