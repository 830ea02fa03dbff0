use std::{fs, path::Path};

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    auth::{hash_password, new_id},
    config::Config,
    models::ROLE_ADMIN,
};

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// File-backed SQLite needs its parent directory before the first connect.
pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let path = db_url
        .strip_prefix("sqlite://")
        .or_else(|| db_url.strip_prefix("sqlite:"));

    let Some(path) = path else {
        return Ok(());
    };

    let path = path.split('?').next().unwrap_or(path);
    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = path.strip_prefix("file:").unwrap_or(path);
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Guarantees a usable admin account on first startup. An already present
/// admin wins over any configured credentials.
pub async fn seed_admin(pool: &SqlitePool, config: &Config) -> Result<(), sqlx::Error> {
    let existing = sqlx::query_as::<_, (String,)>("SELECT id FROM users WHERE role = ? LIMIT 1")
        .bind(ROLE_ADMIN)
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Ok(());
    }

    let password_hash = match &config.admin_pass_hash {
        Some(hash) => hash.clone(),
        None => {
            let password = config.admin_password.as_deref().unwrap_or("admin");
            if password == "admin" {
                log::warn!(
                    "ADMIN_PASSWORD not set. Using default password 'admin'. Set ADMIN_PASSWORD or ADMIN_PASS_HASH in production."
                );
            }
            hash_password(password)
                .map_err(|_| sqlx::Error::Protocol("password hash failed".into()))?
        }
    };

    sqlx::query(
        r#"INSERT INTO users (id, username, password_hash, role, email, created_at)
           VALUES (?, ?, ?, ?, NULL, ?)"#,
    )
    .bind(new_id())
    .bind(&config.admin_user)
    .bind(password_hash)
    .bind(ROLE_ADMIN)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    run_migrations(&pool).await.expect("migrations");
    pool
}
