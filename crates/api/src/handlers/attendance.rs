use crate::handlers::error::{attendance_error, json_body, parse_session_id, ApiError};
use crate::middleware::rate_limit;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::{IntoResponse, Response},
    Json,
};
use rollcall_cache::{records_cache_key, records_generation_key};
use rollcall_models::{AttendanceRecord, SubmitAttendanceRequest, VerifyOtpRequest};
use std::sync::Arc;
use uuid::Uuid;

/// Record a student's QR scan as a pending attendance
/// POST /api/attendance/submit
pub async fn submit_attendance(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SubmitAttendanceRequest>, JsonRejection>,
) -> Result<Json<AttendanceRecord>, ApiError> {
    let request = json_body(payload)?;

    let record = state
        .attendance_service
        .submit_attendance(request.session_id, request.student)
        .await
        .map_err(attendance_error)?;

    invalidate_records(&state, record.session_id).await;

    Ok(Json(record))
}

/// Verify a pending attendance with the live OTP
/// POST /api/attendance/verify
pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<Json<AttendanceRecord>, Response> {
    let request = json_body(payload).map_err(IntoResponse::into_response)?;

    rate_limit::enforce(
        state.cache.as_ref(),
        &format!("verify:{}:{}", request.session_id, request.student_id.trim()),
        state.settings.verify_rate_limit,
        state.settings.verify_rate_window_seconds,
        "verification attempts",
    )
    .await?;

    let record = state
        .attendance_service
        .verify_otp(request.session_id, &request.student_id, &request.code)
        .await
        .map_err(|e| attendance_error(e).into_response())?;

    invalidate_records(&state, record.session_id).await;

    Ok(Json(record))
}

/// Live attendance list, ordered by scan time
/// GET /api/sessions/:session_id/attendance
pub async fn list_records(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError> {
    let session_id = parse_session_id(&session_id)?;

    let records = state
        .attendance_service
        .list_records(session_id)
        .await
        .map_err(attendance_error)?;

    Ok(Json(records))
}

/// Attendance list served through Redis for dashboards that poll
/// GET /api/sessions/:session_id/attendance/cached
pub async fn list_records_cached(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError> {
    let session_id = parse_session_id(&session_id)?;

    // The generation is read before the live list, so a list that raced a
    // write is stored under a generation that is already stale.
    let slot = match &state.cache {
        Some(cache) => match cache.get::<i64>(&records_generation_key(session_id)).await {
            Ok(generation) => {
                let key = records_cache_key(session_id, generation.unwrap_or(0));
                Some((cache, key))
            }
            Err(e) => {
                tracing::error!("Records generation read failed: {}", e);
                None
            }
        },
        None => None,
    };

    if let Some((cache, key)) = &slot {
        match cache.get::<Vec<AttendanceRecord>>(key).await {
            Ok(Some(records)) => {
                tracing::debug!("Records cache hit: session_id={}", session_id);
                return Ok(Json(records));
            }
            Ok(None) => {}
            Err(e) => tracing::error!("Records cache read failed: {}", e),
        }
    }

    let records = state
        .attendance_service
        .list_records(session_id)
        .await
        .map_err(attendance_error)?;

    if let Some((cache, key)) = &slot {
        if let Err(e) = cache
            .set(key, &records, Some(state.settings.records_cache_ttl_seconds))
            .await
        {
            tracing::error!("Records cache write failed: {}", e);
        }
    }

    Ok(Json(records))
}

async fn invalidate_records(state: &AppState, session_id: Uuid) {
    if let Some(cache) = &state.cache {
        if let Err(e) = cache.incr(&records_generation_key(session_id)).await {
            tracing::error!("Records cache invalidation failed: {}", e);
        }
    }
}
