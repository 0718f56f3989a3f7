use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use rollcall_cache::{rate_limit_key, Cache, CacheError};
use serde::Serialize;
use std::sync::Arc;

/// Submissions allowed per client IP per window.
const SUBMIT_IP_LIMIT: u32 = 30;
const SUBMIT_IP_WINDOW_SECONDS: u64 = 60;

/// Verification attempts allowed per client IP per window. A classroom
/// behind one NAT shares this budget.
const VERIFY_IP_LIMIT: u32 = 120;
const VERIFY_IP_WINDOW_SECONDS: u64 = 60;

#[derive(Debug, Serialize)]
struct RateLimitError {
    error: String,
    message: String,
    retry_after: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after: u64 },
}

pub struct RateLimiter {
    cache: Arc<Cache>,
}

impl RateLimiter {
    pub fn new(cache: Arc<Cache>) -> Self {
        Self { cache }
    }

    /// Fixed-window check: the first hit opens the window, later hits only
    /// count against it.
    pub async fn check_rate_limit(
        &self,
        key: &str,
        max_requests: u32,
        window_seconds: u64,
    ) -> Result<RateDecision, CacheError> {
        let key = rate_limit_key(key, &window_seconds.to_string());
        let count = self.cache.incr_window(&key, window_seconds).await?;

        if count <= i64::from(max_requests) {
            return Ok(RateDecision::Allowed);
        }

        let ttl = self.cache.ttl(&key).await?;
        let retry_after = if ttl > 0 { ttl as u64 } else { window_seconds };
        Ok(RateDecision::Limited { retry_after })
    }
}

fn too_many_requests(what: &str, retry_after: u64) -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(RateLimitError {
            error: "rate_limit_exceeded".to_string(),
            message: format!(
                "Too many {}. Please try again in {} seconds.",
                what, retry_after
            ),
            retry_after,
        }),
    )
        .into_response()
}

/// Apply one limit. Without Redis, or when Redis errors, the request is let
/// through.
pub async fn enforce(
    cache: Option<&Arc<Cache>>,
    key: &str,
    max_requests: u32,
    window_seconds: u64,
    what: &str,
) -> Result<(), Response> {
    let Some(cache) = cache else {
        return Ok(());
    };

    let limiter = RateLimiter::new(cache.clone());
    match limiter.check_rate_limit(key, max_requests, window_seconds).await {
        Ok(RateDecision::Allowed) => Ok(()),
        Ok(RateDecision::Limited { retry_after }) => {
            tracing::warn!("Rate limit exceeded: key={}", key);
            Err(too_many_requests(what, retry_after))
        }
        Err(e) => {
            tracing::error!("Rate limit check error: {}", e);
            Ok(())
        }
    }
}

/// Extract IP address from request headers
fn extract_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|h| h.to_str().ok()))
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

/// Rate limit middleware for attendance submissions, per IP
pub async fn rate_limit_submit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip = extract_ip(request.headers());

    enforce(
        state.cache.as_ref(),
        &format!("submit:{}", ip),
        SUBMIT_IP_LIMIT,
        SUBMIT_IP_WINDOW_SECONDS,
        "attendance submissions",
    )
    .await?;

    Ok(next.run(request).await)
}

/// Rate limit middleware for OTP verification, per IP. The per-student
/// limit is applied by the handler once the body is parsed.
pub async fn rate_limit_verify(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip = extract_ip(request.headers());

    enforce(
        state.cache.as_ref(),
        &format!("verify_ip:{}", ip),
        VERIFY_IP_LIMIT,
        VERIFY_IP_WINDOW_SECONDS,
        "verification attempts",
    )
    .await?;

    Ok(next.run(request).await)
}
