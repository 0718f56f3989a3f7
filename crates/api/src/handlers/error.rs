use axum::{extract::rejection::JsonRejection, http::StatusCode, Json};
use rollcall_attendance::AttendanceError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
        }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn invalid_input(message: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new("invalid_input", message)),
    )
}

/// Map a service failure onto the public error contract.
pub fn attendance_error(e: AttendanceError) -> ApiError {
    let (status, error_code) = match &e {
        AttendanceError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
        AttendanceError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "session_not_found"),
        AttendanceError::RecordNotFound { .. } => (StatusCode::NOT_FOUND, "record_not_found"),
        AttendanceError::SessionEnded(_) => (StatusCode::CONFLICT, "session_ended"),
        AttendanceError::InvalidOrExpiredOtp => {
            (StatusCode::UNAUTHORIZED, "invalid_or_expired_otp")
        }
        AttendanceError::Export(_) | AttendanceError::Storage(_) => {
            tracing::error!("Request failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("internal_error", "Internal server error")),
            );
        }
    };

    (status, Json(ErrorResponse::new(error_code, &e.to_string())))
}

/// Unwrap a JSON body, turning extractor rejections into `invalid_input`.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| invalid_input(&rejection.body_text()))
}

pub fn parse_session_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| invalid_input("Malformed session id"))
}
