use actix_web::{http::header, web, HttpRequest, HttpResponse};
use askama::Template;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{self, clear_session_cookie, session_cookie, Action},
    bookings::{self, BookingRequest},
    error::ApiError,
    slots,
    state::AppState,
    users,
};

#[derive(Template)]
#[template(path = "print.html")]
struct PrintTemplate {
    brand: String,
    booking_id: String,
    date: String,
    time: String,
    duration: i64,
    full_name: String,
    email: String,
    phone: String,
    address: String,
    plz: String,
    city: String,
    units: String,
    note: String,
    created_at: String,
}

#[derive(Deserialize)]
struct SlotsQuery {
    date: Option<String>,
}

#[derive(Deserialize)]
struct SlotCreate {
    date: String,
    time: String,
    duration: Option<i64>,
}

#[derive(Deserialize)]
struct LoginPayload {
    username: String,
    password: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/slots")
            .route(web::get().to(list_slots))
            .route(web::post().to(create_slot)),
    )
    .service(web::resource("/api/bookings").route(web::post().to(create_booking)))
    .service(web::resource("/api/bookings/{id}/print").route(web::get().to(print_booking)))
    .service(web::resource("/api/auth/login").route(web::post().to(login)))
    .service(web::resource("/api/auth/logout").route(web::post().to(logout)))
    .service(web::resource("/api/auth/me").route(web::get().to(me)))
    .service(web::resource("/health").route(web::get().to(health)));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

async fn list_slots(
    state: web::Data<AppState>,
    query: web::Query<SlotsQuery>,
) -> Result<HttpResponse, ApiError> {
    let rows = slots::list(&state.db, query.date.as_deref()).await?;
    Ok(HttpResponse::Ok().json(rows))
}

async fn create_slot(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<SlotCreate>,
) -> Result<HttpResponse, ApiError> {
    auth::require(&req, &state, Action::CreateSlot)?;
    let slot = slots::create(&state.db, &payload.date, &payload.time, payload.duration).await?;
    Ok(HttpResponse::Ok().json(slot))
}

async fn create_booking(
    state: web::Data<AppState>,
    payload: web::Json<BookingRequest>,
) -> Result<HttpResponse, ApiError> {
    let created = bookings::create(&state.db, &payload).await?;
    state.mailer.notify_booking_created(created.mail);
    Ok(HttpResponse::Ok().json(json!({
        "bookingId": created.booking_id,
        "slotId": created.slot_id,
    })))
}

async fn print_booking(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let Some(row) = bookings::fetch_print(&state.db, &id).await? else {
        return Ok(HttpResponse::NotFound()
            .content_type("text/plain; charset=utf-8")
            .body("Nicht gefunden"));
    };

    let template = PrintTemplate {
        brand: state.brand.clone(),
        booking_id: row.id,
        date: row.date,
        time: row.time,
        duration: row.duration,
        full_name: row.full_name,
        email: row.email,
        phone: row.phone,
        address: row.address,
        plz: row.plz,
        city: row.city,
        units: row
            .units
            .map(|value| value.to_string())
            .unwrap_or_else(|| "–".to_string()),
        note: row.note.unwrap_or_else(|| "–".to_string()),
        created_at: row.created_at,
    };

    match template.render() {
        Ok(body) => Ok(HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(body)),
        Err(err) => {
            log::error!("Print template render error: {err}");
            Ok(HttpResponse::InternalServerError().finish())
        }
    }
}

async fn login(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<LoginPayload>,
) -> Result<HttpResponse, ApiError> {
    let user = users::authenticate(&state.db, &payload.username, &payload.password)
        .await?
        .ok_or(ApiError::BadCredentials)?;

    let token = auth::issue_token(&user, &state.jwt)?;
    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&req, token))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(json!({ "ok": true })))
}

async fn logout(req: HttpRequest) -> HttpResponse {
    HttpResponse::Ok()
        .cookie(clear_session_cookie(&req))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(json!({ "ok": true }))
}

async fn me(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    match auth::current_user(&req, &state) {
        Some(user) => HttpResponse::Ok().json(json!({
            "authenticated": true,
            "username": user.username,
            "role": user.role,
        })),
        None => HttpResponse::Ok().json(json!({ "authenticated": false })),
    }
}
