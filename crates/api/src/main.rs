// Rollcall API Server
// Attendance sessions, rotating OTPs and the attendance sheet over HTTP

mod config;
mod handlers;
mod middleware;
mod routes;

use anyhow::Context;
use config::{ApiSettings, Config, StorageBackend};
use dotenvy::dotenv;
use rollcall_attendance::{AttendanceService, SystemClock};
use rollcall_database::{AttendanceRepository, Database, SessionRepository};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub struct AppState {
    pub attendance_service: Arc<AttendanceService>,
    pub cache: Option<Arc<rollcall_cache::Cache>>,
    pub settings: ApiSettings,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,rollcall_api=debug,tower_http=debug".to_string()),
        )
        .init();

    tracing::info!("🚀 Starting Rollcall API Server");
    tracing::info!("📦 Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("🔌 Server: {}:{}", config.server_host, config.server_port);
    tracing::info!(
        "⏱️  OTP: {} digits, valid for {}s",
        config.attendance.otp_digits,
        config.attendance.otp_validity.num_seconds()
    );

    let clock = Arc::new(SystemClock);

    // Initialize storage
    let attendance_service = match config.storage_backend {
        StorageBackend::Postgres => {
            tracing::info!("🗄️  Connecting to database...");
            let database = Database::new(config.database.clone())
                .await
                .context("Failed to connect to database")?;
            database.ping().await.context("Database ping failed")?;
            database.migrate().await.context("Database migration failed")?;
            tracing::info!("✅ Database connected");

            AttendanceService::new(
                Arc::new(SessionRepository::new(database.pool().clone())),
                Arc::new(AttendanceRepository::new(database.pool().clone())),
                clock,
                config.attendance.clone(),
            )?
        }
        StorageBackend::Memory => {
            tracing::warn!("💾 Using in-memory storage; attendance is lost on restart");
            AttendanceService::in_memory(clock, config.attendance.clone())?
        }
    };
    tracing::info!("📝 Attendance service initialized");

    // Initialize cache
    let cache = match config.cache.clone() {
        Some(cache_config) => {
            tracing::info!("⚡ Connecting to Redis...");
            let cache = rollcall_cache::Cache::new(cache_config)
                .await
                .context("Failed to connect to Redis")?;
            cache.ping().await.context("Redis ping failed")?;
            tracing::info!("✅ Redis connected");
            Some(Arc::new(cache))
        }
        None => {
            tracing::info!("⚡ REDIS_URL not set; rate limiting and records cache disabled");
            None
        }
    };

    // Create app state
    let state = Arc::new(AppState {
        attendance_service: Arc::new(attendance_service),
        cache,
        settings: config.api.clone(),
    });

    // Create router
    let app = routes::create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    tracing::info!("📡 Routes configured:");
    tracing::info!("   GET  /health");
    tracing::info!("   POST /api/sessions");
    tracing::info!("   GET  /api/sessions/:session_id");
    tracing::info!("   GET  /api/teachers/:teacher_id/sessions");
    tracing::info!("   POST /api/sessions/:session_id/otp");
    tracing::info!("   POST /api/sessions/:session_id/end");
    tracing::info!("   GET  /api/sessions/:session_id/summary");
    tracing::info!("   GET  /api/sessions/:session_id/attendance[/cached|/download]");
    tracing::info!("   GET  /api/qr/:qr_token");
    tracing::info!("   POST /api/attendance/submit");
    tracing::info!("   POST /api/attendance/verify");

    // Start server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("✅ Server ready at http://{}", addr);
    tracing::info!("🎯 Ready to accept requests!");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
