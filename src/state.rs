use crate::config::Config;
use crate::utils::token::TokenCodec;
use axum::extract::FromRef;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub codec: TokenCodec,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        let codec = TokenCodec::new(&config.quiz_secret);
        Self {
            pool,
            config,
            codec,
        }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for TokenCodec {
    fn from_ref(state: &AppState) -> Self {
        state.codec.clone()
    }
}
