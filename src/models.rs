use serde::Serialize;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

pub const STATUS_FREE: &str = "free";
pub const STATUS_BOOKED: &str = "booked";

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SlotRow {
    pub id: String,
    pub date: String,
    pub time: String,
    pub duration: i64,
    pub status: String,
}

/// Booking joined with its slot, as served by the admin listings,
/// the CSV export and the print page.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BookingRow {
    pub id: String,
    pub slot_id: String,
    pub date: String,
    pub time: String,
    pub duration: i64,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub plz: String,
    pub city: String,
    pub units: Option<i64>,
    pub note: Option<String>,
    pub created_at: String,
    pub completed_by: Option<String>,
    pub completed_at: Option<String>,
}

/// Immutable audit snapshot taken when a booking is canceled.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CanceledBookingRow {
    pub id: String,
    pub booking_id: String,
    pub date: String,
    pub time: String,
    pub duration: i64,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub plz: String,
    pub city: String,
    pub units: Option<i64>,
    pub note: Option<String>,
    pub reason: String,
    pub canceled_by: String,
    pub canceled_by_id: String,
    pub created_at: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub email: Option<String>,
    pub created_at: String,
}

/// User as exposed over the API. Never carries the password hash.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub role: String,
    pub email: Option<String>,
    pub created_at: String,
}
