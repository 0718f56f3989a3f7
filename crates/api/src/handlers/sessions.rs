use crate::handlers::error::{attendance_error, json_body, parse_session_id, ApiError};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use rollcall_models::{IssuedOtp, NewSession, SessionPublicView, SessionSummary, SessionView};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct EndSessionResponse {}

/// Start a new attendance session
/// POST /api/sessions
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewSession>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let new_session = json_body(payload)?;

    let session = state
        .attendance_service
        .create_session(new_session)
        .await
        .map_err(attendance_error)?;

    Ok((StatusCode::CREATED, Json(session.view())))
}

/// GET /api/sessions/:session_id
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let session_id = parse_session_id(&session_id)?;

    let session = state
        .attendance_service
        .get_session(session_id)
        .await
        .map_err(attendance_error)?;

    Ok(Json(session.view()))
}

/// Session history for the teacher dashboard, newest first
/// GET /api/teachers/:teacher_id/sessions
pub async fn list_teacher_sessions(
    State(state): State<Arc<AppState>>,
    Path(teacher_id): Path<String>,
) -> Result<Json<Vec<SessionView>>, ApiError> {
    let sessions = state
        .attendance_service
        .list_teacher_sessions(&teacher_id)
        .await
        .map_err(attendance_error)?;

    Ok(Json(sessions.iter().map(|s| s.view()).collect()))
}

/// Issue a fresh OTP, replacing the current one
/// POST /api/sessions/:session_id/otp
pub async fn generate_otp(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<IssuedOtp>, ApiError> {
    let session_id = parse_session_id(&session_id)?;

    let issued = state
        .attendance_service
        .generate_otp(session_id)
        .await
        .map_err(attendance_error)?;

    Ok(Json(issued))
}

/// POST /api/sessions/:session_id/end
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<EndSessionResponse>, ApiError> {
    let session_id = parse_session_id(&session_id)?;

    state
        .attendance_service
        .end_session(session_id)
        .await
        .map_err(attendance_error)?;

    Ok(Json(EndSessionResponse {}))
}

/// GET /api/sessions/:session_id/summary
pub async fn session_summary(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSummary>, ApiError> {
    let session_id = parse_session_id(&session_id)?;

    let summary = state
        .attendance_service
        .session_summary(session_id)
        .await
        .map_err(attendance_error)?;

    Ok(Json(summary))
}

/// Resolve a scanned QR payload to the public session view
/// GET /api/qr/:qr_token
pub async fn resolve_qr(
    State(state): State<Arc<AppState>>,
    Path(qr_token): Path<String>,
) -> Result<Json<SessionPublicView>, ApiError> {
    let session = state
        .attendance_service
        .resolve_qr_token(&qr_token)
        .await
        .map_err(attendance_error)?;

    Ok(Json(session.public_view()))
}
