use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::{
    auth::{self, Action},
    error::ApiError,
    state::AppState,
    users::{self, UserCreate, UserUpdate},
};

pub async fn list_users(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    auth::require(&req, &state, Action::ManageUsers)?;
    let rows = users::list(&state.db).await?;
    Ok(HttpResponse::Ok().json(rows))
}

pub async fn create_user(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<UserCreate>,
) -> Result<HttpResponse, ApiError> {
    auth::require(&req, &state, Action::ManageUsers)?;
    let view = users::create(&state.db, &payload).await?;
    Ok(HttpResponse::Ok().json(view))
}

pub async fn update_user(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    payload: web::Json<UserUpdate>,
) -> Result<HttpResponse, ApiError> {
    auth::require(&req, &state, Action::ManageUsers)?;
    let view = users::update(&state.db, &path.into_inner(), &payload).await?;
    Ok(HttpResponse::Ok().json(view))
}

pub async fn delete_user(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    auth::require(&req, &state, Action::ManageUsers)?;
    users::delete(&state.db, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}
