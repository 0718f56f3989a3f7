use crate::handlers::error::{attendance_error, parse_session_id, ApiError};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use rollcall_attendance::CsvExporter;
use std::sync::Arc;

/// Download the attendance sheet as CSV
/// GET /api/sessions/:session_id/attendance/download
pub async fn download_records(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Response, ApiError> {
    let session_id = parse_session_id(&session_id)?;

    let file = state
        .attendance_service
        .export_records(session_id, &CsvExporter)
        .await
        .map_err(attendance_error)?;

    let disposition = format!("attachment; filename=\"{}\"", file.filename);

    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}
