use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;

/// Shared application state. The pool is opened once in `main` and handed
/// to every handler through axum's state extraction; nothing reads the
/// environment or touches a global connection after startup.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }
}
