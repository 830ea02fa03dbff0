use actix_web::{http::header, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{self, Action},
    bookings,
    error::ApiError,
    routes::users,
    slots::{self, BulkRequest},
    state::AppState,
};

#[derive(Deserialize)]
pub struct RangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Deserialize)]
struct CancelPayload {
    reason: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/slots/bulk").route(web::post().to(bulk_create_slots)))
        .service(web::resource("/api/slots/{id}").route(web::delete().to(delete_slot)))
        .service(web::resource("/api/bookings.csv").route(web::get().to(export_csv)))
        .service(
            web::scope("/api/admin")
                .service(web::resource("/bookings").route(web::get().to(list_open)))
                .service(web::resource("/completed").route(web::get().to(list_completed)))
                .service(web::resource("/cancellations").route(web::get().to(list_cancellations)))
                .service(
                    web::resource("/bookings/{id}/complete")
                        .route(web::post().to(complete_booking)),
                )
                .service(web::resource("/bookings/{id}").route(web::delete().to(cancel_booking)))
                .service(
                    web::resource("/users")
                        .route(web::get().to(users::list_users))
                        .route(web::post().to(users::create_user)),
                )
                .service(
                    web::resource("/users/{id}")
                        .route(web::patch().to(users::update_user))
                        .route(web::delete().to(users::delete_user)),
                ),
        );
}

async fn bulk_create_slots(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<BulkRequest>,
) -> Result<HttpResponse, ApiError> {
    auth::require(&req, &state, Action::BulkCreateSlots)?;
    let outcome = slots::create_bulk(&state.db, &payload).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

async fn delete_slot(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    auth::require(&req, &state, Action::DeleteSlot)?;
    let deleted = slots::delete(&state.db, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "deleted": deleted })))
}

async fn list_open(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, ApiError> {
    auth::require(&req, &state, Action::ListBookings)?;
    let rows = bookings::list_open(&state.db, query.from.as_deref(), query.to.as_deref()).await?;
    Ok(HttpResponse::Ok().json(rows))
}

async fn list_completed(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, ApiError> {
    auth::require(&req, &state, Action::ListBookings)?;
    let rows =
        bookings::list_completed(&state.db, query.from.as_deref(), query.to.as_deref()).await?;
    Ok(HttpResponse::Ok().json(rows))
}

async fn list_cancellations(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, ApiError> {
    auth::require(&req, &state, Action::ListBookings)?;
    let rows =
        bookings::list_cancellations(&state.db, query.from.as_deref(), query.to.as_deref()).await?;
    Ok(HttpResponse::Ok().json(rows))
}

async fn complete_booking(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let actor = auth::require(&req, &state, Action::CompleteBooking)?;
    bookings::complete(&state.db, &path.into_inner(), &actor).await?;
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

async fn cancel_booking(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    payload: web::Json<CancelPayload>,
) -> Result<HttpResponse, ApiError> {
    let actor = auth::require(&req, &state, Action::CancelBooking)?;
    let mail = bookings::cancel(&state.db, &path.into_inner(), &payload.reason, &actor).await?;
    state
        .mailer
        .notify_booking_canceled(mail, payload.reason.trim().to_string());
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

async fn export_csv(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    auth::require(&req, &state, Action::ExportBookings)?;
    let csv = bookings::csv_export(&state.db).await?;
    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"bookings.csv\"",
        ))
        .body(csv))
}
