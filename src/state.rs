use sqlx::SqlitePool;

use crate::{auth::JwtConfig, mailer::Mailer};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub jwt: JwtConfig,
    pub mailer: Mailer,
    pub brand: String,
}
