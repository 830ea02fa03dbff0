use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Request-level failures, mapped to a JSON body of `{"error": "<code>"}`.
///
/// Server-side failures keep their detail in the log; the client only sees
/// the generic code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("required fields missing or malformed")]
    MissingFields,
    #[error("cancellation requires a reason")]
    ReasonRequired,
    #[error("bad credentials")]
    BadCredentials,
    #[error("missing or invalid session token")]
    Unauthorized,
    #[error("role not allowed to perform this action")]
    Forbidden,
    #[error("slot not found")]
    SlotNotFound,
    #[error("not found")]
    NotFound,
    #[error("slot is already booked")]
    AlreadyBooked,
    #[error("username is already taken")]
    UserExists,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("password hashing failed")]
    Hash,
    #[error("session token could not be issued")]
    Token,
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingFields => "missing_fields",
            Self::ReasonRequired => "reason_required",
            Self::BadCredentials => "bad_credentials",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::SlotNotFound => "slot_not_found",
            Self::NotFound => "not_found",
            Self::AlreadyBooked => "already_booked",
            Self::UserExists => "user_exists",
            Self::Database(_) => "db_failed",
            Self::Hash => "hash_failed",
            Self::Token => "token_failed",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingFields | Self::ReasonRequired => StatusCode::BAD_REQUEST,
            Self::BadCredentials | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::SlotNotFound | Self::NotFound => StatusCode::NOT_FOUND,
            Self::AlreadyBooked | Self::UserExists => StatusCode::CONFLICT,
            Self::Database(_) | Self::Hash | Self::Token => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("{self}");
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.code() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_status() {
        assert_eq!(ApiError::AlreadyBooked.code(), "already_booked");
        assert_eq!(ApiError::AlreadyBooked.status_code(), StatusCode::CONFLICT);
        assert_eq!(ApiError::SlotNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::ReasonRequired.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Forbidden.status_code(), StatusCode::FORBIDDEN);
    }
}
