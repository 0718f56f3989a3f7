use crate::handlers;
use crate::middleware;
use crate::AppState;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health::health_check))
        // Teacher: sessions and OTPs
        .route("/api/sessions", post(handlers::sessions::create_session))
        .route("/api/sessions/:session_id", get(handlers::sessions::get_session))
        .route(
            "/api/teachers/:teacher_id/sessions",
            get(handlers::sessions::list_teacher_sessions),
        )
        .route("/api/sessions/:session_id/otp", post(handlers::sessions::generate_otp))
        .route("/api/sessions/:session_id/end", post(handlers::sessions::end_session))
        .route("/api/sessions/:session_id/summary", get(handlers::sessions::session_summary))
        // Teacher: attendance sheet
        .route("/api/sessions/:session_id/attendance", get(handlers::attendance::list_records))
        .route(
            "/api/sessions/:session_id/attendance/cached",
            get(handlers::attendance::list_records_cached),
        )
        .route(
            "/api/sessions/:session_id/attendance/download",
            get(handlers::export::download_records),
        )
        // Student: scan and verify
        .route("/api/qr/:qr_token", get(handlers::sessions::resolve_qr))
        .route(
            "/api/attendance/submit",
            post(handlers::attendance::submit_attendance)
                .layer(from_fn_with_state(state.clone(), middleware::rate_limit_submit)),
        )
        .route(
            "/api/attendance/verify",
            post(handlers::attendance::verify_otp)
                .layer(from_fn_with_state(state.clone(), middleware::rate_limit_verify)),
        )
        .with_state(state)
}
