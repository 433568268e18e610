use std::sync::Arc;

use crate::{audit::AuditLogger, config::AppConfig, database::Database};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
    pub audit: AuditLogger,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        let audit = AuditLogger::new(db.audit.clone());
        Self {
            db,
            config: Arc::new(config),
            audit,
        }
    }
}
