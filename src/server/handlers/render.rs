//! Pattern, preview and export handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::WatermarkConfig;
use crate::error::WatermarkError;
use crate::loader::SourceImage;
use crate::render::compositor::Compositor;
use crate::render::export::{self, ExportScale, PREVIEW_MAX_DIM};
use crate::render::tiling::TilePattern;

use super::super::state::AppState;
use super::{ApiError, api_error, with_session};

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// 1 for native resolution, 2 for double.
    #[serde(default)]
    pub scale: Option<u32>,
}

fn no_image() -> ApiError {
    (StatusCode::CONFLICT, "No image loaded".to_string())
}

/// Clone the image handle and config out of the session (minimize lock time).
async fn snapshot(
    state: &AppState,
    id: &str,
) -> Result<(Arc<SourceImage>, WatermarkConfig), ApiError> {
    with_session(state, id, |s| {
        s.image().cloned().map(|img| (img, s.config().clone()))
    })
    .await?
    .ok_or_else(no_image)
}

/// GET /api/sessions/:id/pattern - Tile layout for the preview overlay.
pub async fn pattern(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TilePattern>, ApiError> {
    let (image, config) = snapshot(&state, &id).await?;
    let pattern = Compositor::new(&state.font).pattern(image.width, image.height, &config);
    Ok(Json(pattern))
}

/// GET /api/sessions/:id/preview - Size-limited composited PNG.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (image, config) = snapshot(&state, &id).await?;
    let font = state.font.clone();

    // Move CPU-intensive work to blocking thread pool
    let png_bytes = tokio::task::spawn_blocking(move || {
        export::preview_png(&image.image, &config, &font, PREVIEW_MAX_DIM)
    })
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Processing error: {}", e),
        )
    })?
    .map_err(api_error)?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        png_bytes,
    ))
}

/// POST /api/sessions/:id/export - Render and download the watermarked image.
///
/// An empty session is a no-op answered with 204 and no body.
pub async fn export(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let scale = ExportScale::try_from(query.scale.unwrap_or(1)).map_err(api_error)?;

    let Some(job) = with_session(&state, &id, |s| s.begin_export(scale)).await? else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let font = state.font.clone();
    let timestamp_ms = chrono::Utc::now().timestamp_millis();
    let result = match tokio::task::spawn_blocking(move || job.run(&font, timestamp_ms)).await {
        Ok(result) => result,
        Err(e) => Err(WatermarkError::Encode(format!("Task error: {}", e))),
    };

    // The session may have expired while we were encoding; nothing to report then
    if with_session(&state, &id, |s| s.finish_export(&result)).await.is_err() {
        warn!(session = %id, "session vanished during export");
    }

    let download = result.map_err(api_error)?;
    info!(
        session = %id,
        filename = %download.filename,
        bytes = download.bytes.len(),
        "export delivered"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", download.filename),
            ),
        ],
        download.bytes,
    )
        .into_response())
}
