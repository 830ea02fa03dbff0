use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    auth::{new_id, AuthUser},
    error::ApiError,
    mailer::BookingMail,
    models::{BookingRow, CanceledBookingRow, SlotRow, STATUS_BOOKED, STATUS_FREE},
};

const BOOKING_COLUMNS: &str = "b.id, b.slot_id, s.date, s.time, s.duration, b.full_name, \
     b.email, b.phone, b.address, b.plz, b.city, b.units, b.note, b.created_at, \
     b.completed_by, b.completed_at";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub slot_id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub plz: String,
    pub city: String,
    pub units: Option<i64>,
    pub note: Option<String>,
}

impl BookingRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let required = [
            &self.slot_id,
            &self.full_name,
            &self.email,
            &self.phone,
            &self.address,
            &self.plz,
            &self.city,
        ];
        if required.iter().any(|field| field.trim().is_empty()) {
            return Err(ApiError::MissingFields);
        }
        Ok(())
    }
}

pub struct CreatedBooking {
    pub booking_id: String,
    pub slot_id: String,
    pub mail: BookingMail,
}

/// Books a free slot. Booking insert and slot flip share one transaction;
/// the guarded UPDATE decides a concurrent race, so exactly one of two
/// simultaneous calls wins and the other sees `already_booked`.
pub async fn create(pool: &SqlitePool, request: &BookingRequest) -> Result<CreatedBooking, ApiError> {
    request.validate()?;

    let mut tx = pool.begin().await?;

    let slot = sqlx::query_as::<_, SlotRow>(
        "SELECT id, date, time, duration, status FROM slots WHERE id = ?",
    )
    .bind(request.slot_id.trim())
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(ApiError::SlotNotFound)?;

    if slot.status != STATUS_FREE {
        return Err(ApiError::AlreadyBooked);
    }

    let booking_id = new_id();
    sqlx::query(
        r#"INSERT INTO bookings
           (id, slot_id, full_name, email, phone, address, plz, city, units, note, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&booking_id)
    .bind(&slot.id)
    .bind(request.full_name.trim())
    .bind(request.email.trim())
    .bind(request.phone.trim())
    .bind(request.address.trim())
    .bind(request.plz.trim())
    .bind(request.city.trim())
    .bind(request.units)
    .bind(&request.note)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *tx)
    .await?;

    let flipped = sqlx::query("UPDATE slots SET status = ? WHERE id = ? AND status = ?")
        .bind(STATUS_BOOKED)
        .bind(&slot.id)
        .bind(STATUS_FREE)
        .execute(&mut *tx)
        .await?;
    if flipped.rows_affected() == 0 {
        return Err(ApiError::AlreadyBooked);
    }

    tx.commit().await?;

    let mail = BookingMail {
        booking_id: booking_id.clone(),
        date: slot.date,
        time: slot.time,
        duration: slot.duration,
        full_name: request.full_name.trim().to_string(),
        email: request.email.trim().to_string(),
        phone: request.phone.trim().to_string(),
        address: request.address.trim().to_string(),
        plz: request.plz.trim().to_string(),
        city: request.city.trim().to_string(),
        units: request.units,
        note: request.note.clone(),
    };

    Ok(CreatedBooking {
        booking_id,
        slot_id: slot.id,
        mail,
    })
}

/// Marking done is idempotent: the first completion stamp wins and is
/// never overwritten.
pub async fn complete(pool: &SqlitePool, id: &str, actor: &AuthUser) -> Result<(), ApiError> {
    let (completed_at,) =
        sqlx::query_as::<_, (Option<String>,)>("SELECT completed_at FROM bookings WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(ApiError::NotFound)?;

    if completed_at.is_some() {
        return Ok(());
    }

    sqlx::query(
        "UPDATE bookings SET completed_by = ?, completed_at = ? WHERE id = ? AND completed_at IS NULL",
    )
    .bind(&actor.username)
    .bind(Utc::now().to_rfc3339())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Cancels a booking: archive snapshot, booking removal and slot release
/// happen in one transaction or not at all.
pub async fn cancel(
    pool: &SqlitePool,
    id: &str,
    reason: &str,
    actor: &AuthUser,
) -> Result<BookingMail, ApiError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ApiError::ReasonRequired);
    }

    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings b JOIN slots s ON s.id = b.slot_id WHERE b.id = ?"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(ApiError::NotFound)?;

    sqlx::query(
        r#"INSERT INTO canceled_bookings
           (id, booking_id, date, time, duration, full_name, email, phone, address, plz, city,
            units, note, reason, canceled_by, canceled_by_id, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(new_id())
    .bind(&row.id)
    .bind(&row.date)
    .bind(&row.time)
    .bind(row.duration)
    .bind(&row.full_name)
    .bind(&row.email)
    .bind(&row.phone)
    .bind(&row.address)
    .bind(&row.plz)
    .bind(&row.city)
    .bind(row.units)
    .bind(&row.note)
    .bind(reason)
    .bind(&actor.username)
    .bind(&actor.id)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM bookings WHERE id = ?")
        .bind(&row.id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE slots SET status = ? WHERE id = ?")
        .bind(STATUS_FREE)
        .bind(&row.slot_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(BookingMail {
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
        units: row.units,
        note: row.note,
    })
}

pub async fn list_open(
    pool: &SqlitePool,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Vec<BookingRow>, ApiError> {
    let rows = sqlx::query_as::<_, BookingRow>(&format!(
        r#"SELECT {BOOKING_COLUMNS}
           FROM bookings b JOIN slots s ON s.id = b.slot_id
           WHERE b.completed_at IS NULL
             AND s.date >= COALESCE(?, s.date) AND s.date <= COALESCE(?, s.date)
           ORDER BY s.date, s.time"#
    ))
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn list_completed(
    pool: &SqlitePool,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Vec<BookingRow>, ApiError> {
    let rows = sqlx::query_as::<_, BookingRow>(&format!(
        r#"SELECT {BOOKING_COLUMNS}
           FROM bookings b JOIN slots s ON s.id = b.slot_id
           WHERE b.completed_at IS NOT NULL
             AND s.date >= COALESCE(?, s.date) AND s.date <= COALESCE(?, s.date)
           ORDER BY s.date, s.time"#
    ))
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn list_cancellations(
    pool: &SqlitePool,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Vec<CanceledBookingRow>, ApiError> {
    let rows = sqlx::query_as::<_, CanceledBookingRow>(
        r#"SELECT id, booking_id, date, time, duration, full_name, email, phone, address,
                  plz, city, units, note, reason, canceled_by, canceled_by_id, created_at
           FROM canceled_bookings
           WHERE date >= COALESCE(?, date) AND date <= COALESCE(?, date)
           ORDER BY date, time"#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn fetch_print(pool: &SqlitePool, id: &str) -> Result<Option<BookingRow>, ApiError> {
    let row = sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings b JOIN slots s ON s.id = b.slot_id WHERE b.id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Open and completed bookings as CSV text; fields are quoted and embedded
/// quotes doubled.
pub async fn csv_export(pool: &SqlitePool) -> Result<String, ApiError> {
    const HEADER: [&str; 15] = [
        "booking_id",
        "date",
        "time",
        "duration",
        "full_name",
        "email",
        "phone",
        "address",
        "plz",
        "city",
        "units",
        "note",
        "created_at",
        "completed_by",
        "completed_at",
    ];

    let rows = sqlx::query_as::<_, BookingRow>(&format!(
        r#"SELECT {BOOKING_COLUMNS}
           FROM bookings b JOIN slots s ON s.id = b.slot_id
           ORDER BY s.date, s.time"#
    ))
    .fetch_all(pool)
    .await?;

    let mut lines = vec![HEADER.join(",")];
    for row in rows {
        let fields = [
            row.id,
            row.date,
            row.time,
            row.duration.to_string(),
            row.full_name,
            row.email,
            row.phone,
            row.address,
            row.plz,
            row.city,
            row.units.map(|value| value.to_string()).unwrap_or_default(),
            row.note.unwrap_or_default(),
            row.created_at,
            row.completed_by.unwrap_or_default(),
            row.completed_at.unwrap_or_default(),
        ];
        let line = fields
            .iter()
            .map(|field| csv_field(field))
            .collect::<Vec<_>>()
            .join(",");
        lines.push(line);
    }
    Ok(lines.join("\n"))
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
