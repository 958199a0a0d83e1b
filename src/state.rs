use std::sync::Arc;

use diesel::{
    pg::PgConnection,
    r2d2::{ConnectionManager, PooledConnection},
};

use crate::{
    auth::{jwt::JwtService, AuthenticatedUser},
    config::AppConfig,
    db::PgPool,
    error::{AppError, AppResult},
    kanban::{PgStatusWriter, RowPolicy},
};

type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub jwt: JwtService,
}

impl AppState {
    pub fn new(pool: PgPool, config: AppConfig, jwt: JwtService) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            jwt,
        }
    }

    pub fn db(&self) -> AppResult<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|err| AppError::internal(format!("database pool error: {err}")))
    }

    /// Status writer scoped to the rows `user` is allowed to change.
    pub fn status_writer(&self, user: &AuthenticatedUser) -> PgStatusWriter {
        PgStatusWriter::new(self.pool.clone(), RowPolicy::for_user(user))
    }
}
