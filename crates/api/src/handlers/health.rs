use crate::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub cache: String,
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let cache = match &state.cache {
        None => "disabled",
        Some(cache) => match cache.ping().await {
            Ok(()) => "connected",
            Err(e) => {
                tracing::warn!("Redis ping failed: {}", e);
                "unavailable"
            }
        },
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache: cache.to_string(),
    })
}
