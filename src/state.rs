use std::sync::Arc;

use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::SqliteConnection;

use crate::{
    config::AppConfig,
    db::SqlitePool,
    error::{AppError, AppResult},
    storage::AttachmentStore,
};

type PooledSqliteConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<AppConfig>,
    pub attachments: Arc<dyn AttachmentStore>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: AppConfig, attachments: Arc<dyn AttachmentStore>) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            attachments,
        }
    }

    pub fn db(&self) -> AppResult<PooledSqliteConnection> {
        self.pool
            .get()
            .map_err(|err| AppError::internal(format!("database pool error: {err}")))
    }
}
