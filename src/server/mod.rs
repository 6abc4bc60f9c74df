//! # Local Web UI
//!
//! Serves a single-page watermark tool and the JSON/PNG API behind it.
//! Images never leave the machine: they are decoded into memory, kept for
//! the life of a browser session, and dropped on reset or expiry.
//!
//! ## Usage
//!
//! ```bash
//! watermark-pro serve --listen 127.0.0.1:8080
//! ```
//!
//! Then open http://localhost:8080 in a browser.

mod handlers;
mod state;
mod static_files;

pub use state::{AppState, ServerConfig};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::WatermarkError;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        // Frontend
        .route("/", get(static_files::index_handler))
        .route("/assets/*path", get(static_files::asset_handler))
        // Sessions
        .route("/api/sessions", post(handlers::sessions::create))
        .route("/api/sessions/:id", get(handlers::sessions::show))
        .route(
            "/api/sessions/:id/config",
            get(handlers::sessions::get_config).put(handlers::sessions::put_config),
        )
        .route(
            "/api/sessions/:id/notifications",
            get(handlers::sessions::notifications),
        )
        // Image
        .route(
            "/api/sessions/:id/image",
            post(handlers::image::upload)
                .delete(handlers::image::reset)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Rendering
        .route("/api/sessions/:id/pattern", get(handlers::render::pattern))
        .route("/api/sessions/:id/preview", get(handlers::render::preview))
        .route("/api/sessions/:id/export", post(handlers::render::export))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use watermark_pro::server::{serve, ServerConfig};
///
/// # async fn example() -> Result<(), watermark_pro::error::WatermarkError> {
/// serve(ServerConfig::default()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig) -> Result<(), WatermarkError> {
    let app_state = Arc::new(AppState::new(config.clone())?);

    // Spawn background session cleanup task
    tokio::spawn(cleanup_sessions(app_state.clone()));

    let app = router(app_state.clone());

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| {
            WatermarkError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to bind to {}: {}", config.listen_addr, e),
            ))
        })?;

    info!(
        listen = %config.listen_addr,
        font = app_state.font.name(),
        "watermark-pro listening, open http://{}/ in your browser",
        config.listen_addr
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// Background task to drop idle sessions.
async fn cleanup_sessions(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));

    loop {
        interval.tick().await;
        let removed = state.sweep_expired(Instant::now()).await;
        if removed > 0 {
            let remaining = state.sessions.read().await.len();
            info!(removed, remaining, "cleaned up expired sessions");
        }
    }
}
