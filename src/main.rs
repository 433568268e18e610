use std::process;

use dotenvy::dotenv;

use inventory_pro::{
    config::{AppConfig, StorageKind},
    create_router,
    database::{create_database_pool, run_migrations, Database},
    seed_admin,
    state::AppState,
};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    if let Err(e) = run().await {
        log::error!("{}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    let db = match config.storage {
        StorageKind::Postgres => {
            let url = config.database_url.as_deref().unwrap_or_default();
            let pool = create_database_pool(url, config.db_max_connections).await?;
            if config.run_migrations {
                run_migrations(&pool).await?;
            }
            Database::postgres(pool)
        }
        StorageKind::Memory => {
            log::warn!("using in-memory storage; data is lost on exit");
            Database::memory()
        }
    };

    let addr = config.bind_address();
    let state = AppState::new(db, config);
    seed_admin(&state).await?;

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("InventoryPro listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
