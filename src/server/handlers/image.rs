//! Image upload and reset handlers.

use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::info;

use crate::error::WatermarkError;
use crate::loader;

use super::super::state::AppState;
use super::{ApiError, SessionSummary, api_error, with_session};

/// A file pulled out of a multipart body.
struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

/// Bodies cut off by the upload limit become `TooLarge`; anything else is a
/// malformed request.
fn multipart_error(context: &str, err: MultipartError) -> WatermarkError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        WatermarkError::TooLarge(err.body_text())
    } else {
        WatermarkError::InvalidInput(format!("{}: {}", context, err.body_text()))
    }
}

async fn read_image_field(multipart: &mut Multipart) -> Result<UploadedFile, WatermarkError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Multipart error", e))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error("Failed to read upload", e))?;
        return Ok(UploadedFile {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    Err(WatermarkError::InvalidInput("No image field found".to_string()))
}

/// POST /api/sessions/:id/image - Upload an image, replacing any current one.
///
/// A rejected upload leaves the session as it was and queues exactly one
/// error notification.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<SessionSummary>, ApiError> {
    // Fail fast on unknown sessions before reading the body
    with_session(&state, &id, |_| ()).await?;

    let decoded = match read_image_field(&mut multipart).await {
        Ok(file) => tokio::task::spawn_blocking(move || {
            loader::load_image(&file.bytes, file.content_type.as_deref(), &file.filename)
        })
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Processing error: {}", e),
            )
        })?,
        Err(e) => Err(e),
    };

    let outcome = with_session(&state, &id, |session| -> Result<_, WatermarkError> {
        session.accept_upload(decoded)?;
        if let Some(source) = session.image() {
            info!(
                session = %id,
                filename = %source.filename,
                width = source.width,
                height = source.height,
                "image uploaded"
            );
        }
        Ok(SessionSummary::new(&id, session))
    })
    .await?;

    outcome.map(Json).map_err(api_error)
}

/// DELETE /api/sessions/:id/image - Discard the loaded image.
pub async fn reset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>, ApiError> {
    let summary = with_session(&state, &id, |session| {
        session.reset();
        SessionSummary::new(&id, session)
    })
    .await?;
    info!(session = %id, "image cleared");
    Ok(Json(summary))
}
