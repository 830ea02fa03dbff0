use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    auth::{hash_password, new_id, verify_password, AuthUser},
    error::ApiError,
    models::{UserRow, UserView, ROLE_ADMIN, ROLE_USER},
};

#[derive(Debug, Deserialize)]
pub struct UserCreate {
    pub username: String,
    pub password: String,
    pub role: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserUpdate {
    pub password: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
}

pub async fn authenticate(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> Result<Option<AuthUser>, ApiError> {
    let user = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, password_hash, role, email, created_at FROM users WHERE username = ? LIMIT 1",
    )
    .bind(username.trim())
    .fetch_optional(pool)
    .await?;

    Ok(user
        .filter(|user| verify_password(password, &user.password_hash))
        .map(|user| AuthUser {
            id: user.id,
            username: user.username,
            role: user.role,
        }))
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<UserView>, ApiError> {
    let rows = sqlx::query_as::<_, UserView>(
        "SELECT id, username, role, email, created_at FROM users ORDER BY username",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn create(pool: &SqlitePool, request: &UserCreate) -> Result<UserView, ApiError> {
    let username = request.username.trim();
    if username.is_empty() || request.password.trim().is_empty() {
        return Err(ApiError::MissingFields);
    }
    let role = normalize_role(request.role.as_deref())?;

    let taken = sqlx::query_as::<_, (String,)>("SELECT id FROM users WHERE username = ? LIMIT 1")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    if taken.is_some() {
        return Err(ApiError::UserExists);
    }

    let id = new_id();
    sqlx::query(
        r#"INSERT INTO users (id, username, password_hash, role, email, created_at)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(username)
    .bind(hash_password(&request.password)?)
    .bind(role)
    .bind(empty_to_none(request.email.as_deref()))
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    fetch_view(pool, &id).await?.ok_or(ApiError::NotFound)
}

/// Partial update; only the provided fields change, the password is
/// re-hashed when present.
pub async fn update(pool: &SqlitePool, id: &str, request: &UserUpdate) -> Result<UserView, ApiError> {
    let user = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, password_hash, role, email, created_at FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::NotFound)?;

    let password_hash = match request.password.as_deref().filter(|p| !p.trim().is_empty()) {
        Some(password) => hash_password(password)?,
        None => user.password_hash,
    };
    let role = match request.role.as_deref() {
        Some(role) => normalize_role(Some(role))?.to_string(),
        None => user.role,
    };
    let email = match request.email.as_deref() {
        Some(email) => empty_to_none(Some(email)),
        None => user.email,
    };

    sqlx::query("UPDATE users SET password_hash = ?, role = ?, email = ? WHERE id = ?")
        .bind(&password_hash)
        .bind(&role)
        .bind(&email)
        .bind(id)
        .execute(pool)
        .await?;

    fetch_view(pool, id).await?.ok_or(ApiError::NotFound)
}

pub async fn delete(pool: &SqlitePool, id: &str) -> Result<(), ApiError> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(())
}

async fn fetch_view(pool: &SqlitePool, id: &str) -> Result<Option<UserView>, ApiError> {
    let row = sqlx::query_as::<_, UserView>(
        "SELECT id, username, role, email, created_at FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

fn normalize_role(role: Option<&str>) -> Result<&'static str, ApiError> {
    match role {
        None => Ok(ROLE_USER),
        Some(value) if value == ROLE_USER => Ok(ROLE_USER),
        Some(value) if value == ROLE_ADMIN => Ok(ROLE_ADMIN),
        Some(_) => Err(ApiError::MissingFields),
    }
}

fn empty_to_none(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn operator_request(username: &str) -> UserCreate {
        UserCreate {
            username: username.to_string(),
            password: "pa55word".to_string(),
            role: None,
            email: Some("ops@firma.de".to_string()),
        }
    }

    #[actix_web::test]
    async fn create_defaults_to_operator_role() {
        let pool = test_pool().await;
        let view = create(&pool, &operator_request("anna")).await.unwrap();
        assert_eq!(view.username, "anna");
        assert_eq!(view.role, ROLE_USER);
        assert_eq!(view.email.as_deref(), Some("ops@firma.de"));

        let listed = list(&pool).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[actix_web::test]
    async fn create_rejects_duplicates_and_bad_roles() {
        let pool = test_pool().await;
        create(&pool, &operator_request("anna")).await.unwrap();

        assert!(matches!(
            create(&pool, &operator_request("anna")).await,
            Err(ApiError::UserExists)
        ));

        let mut bad_role = operator_request("bernd");
        bad_role.role = Some("superuser".to_string());
        assert!(matches!(
            create(&pool, &bad_role).await,
            Err(ApiError::MissingFields)
        ));

        let mut blank = operator_request("carla");
        blank.password = " ".to_string();
        assert!(matches!(
            create(&pool, &blank).await,
            Err(ApiError::MissingFields)
        ));
    }

    #[actix_web::test]
    async fn authenticate_checks_the_hash() {
        let pool = test_pool().await;
        create(&pool, &operator_request("anna")).await.unwrap();

        let user = authenticate(&pool, "anna", "pa55word").await.unwrap();
        assert_eq!(user.unwrap().username, "anna");

        assert!(authenticate(&pool, "anna", "wrong").await.unwrap().is_none());
        assert!(authenticate(&pool, "nobody", "pa55word").await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn update_rehashes_password_and_keeps_rest() {
        let pool = test_pool().await;
        let view = create(&pool, &operator_request("anna")).await.unwrap();

        let updated = update(
            &pool,
            &view.id,
            &UserUpdate {
                password: Some("neues-pw".to_string()),
                role: None,
                email: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.role, ROLE_USER);
        assert_eq!(updated.email.as_deref(), Some("ops@firma.de"));

        assert!(authenticate(&pool, "anna", "pa55word").await.unwrap().is_none());
        assert!(authenticate(&pool, "anna", "neues-pw").await.unwrap().is_some());

        let promoted = update(
            &pool,
            &view.id,
            &UserUpdate {
                password: None,
                role: Some(ROLE_ADMIN.to_string()),
                email: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(promoted.role, ROLE_ADMIN);
        // Password untouched by the role-only update.
        assert!(authenticate(&pool, "anna", "neues-pw").await.unwrap().is_some());
    }

    #[actix_web::test]
    async fn delete_is_final() {
        let pool = test_pool().await;
        let view = create(&pool, &operator_request("anna")).await.unwrap();

        delete(&pool, &view.id).await.unwrap();
        assert!(matches!(
            delete(&pool, &view.id).await,
            Err(ApiError::NotFound)
        ));
        assert!(list(&pool).await.unwrap().is_empty());
    }
}
