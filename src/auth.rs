use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::HttpRequest;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{ROLE_ADMIN, ROLE_USER},
    state::AppState,
};

pub const SESSION_COOKIE: &str = "sb_session";
const SESSION_DAYS: i64 = 7;

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// The staff member acting on a request, decoded from the session cookie.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub role: String,
}

/// Everything a staff session may be asked to do. Role checks live in
/// `AuthUser::can` and nowhere else.
#[derive(Clone, Copy, Debug)]
pub enum Action {
    ListBookings,
    CreateSlot,
    BulkCreateSlots,
    DeleteSlot,
    CompleteBooking,
    CancelBooking,
    ExportBookings,
    ManageUsers,
}

impl AuthUser {
    pub fn can(&self, action: Action) -> bool {
        match action {
            Action::BulkCreateSlots | Action::DeleteSlot | Action::ManageUsers => {
                self.role == ROLE_ADMIN
            }
            _ => self.role == ROLE_ADMIN || self.role == ROLE_USER,
        }
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| ApiError::Hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

pub fn issue_token(user: &AuthUser, config: &JwtConfig) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.clone(),
        username: user.username.clone(),
        role: user.role.clone(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::days(SESSION_DAYS)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|_| ApiError::Token)
}

pub fn verify_token(token: &str, config: &JwtConfig) -> Option<AuthUser> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;
    Some(AuthUser {
        id: data.claims.sub,
        username: data.claims.username,
        role: data.claims.role,
    })
}

pub fn session_cookie(req: &HttpRequest, token: String) -> Cookie<'static> {
    let mut builder = Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::days(SESSION_DAYS));
    if req.connection_info().scheme() == "https" {
        builder = builder.secure(true);
    }
    builder.finish()
}

pub fn clear_session_cookie(req: &HttpRequest) -> Cookie<'static> {
    let mut builder = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(0));
    if req.connection_info().scheme() == "https" {
        builder = builder.secure(true);
    }
    builder.finish()
}

pub fn current_user(req: &HttpRequest, state: &AppState) -> Option<AuthUser> {
    let cookie = req.cookie(SESSION_COOKIE)?;
    verify_token(cookie.value(), &state.jwt)
}

/// Single entry point for protected handlers: resolves the session and
/// enforces the capability in one place.
pub fn require(req: &HttpRequest, state: &AppState, action: Action) -> Result<AuthUser, ApiError> {
    let user = current_user(req, state).ok_or(ApiError::Unauthorized)?;
    if !user.can(action) {
        return Err(ApiError::Forbidden);
    }
    Ok(user)
}
