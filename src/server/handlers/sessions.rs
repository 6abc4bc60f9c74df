//! Session lifecycle and configuration handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::config::WatermarkConfig;
use crate::session::Notification;

use super::super::state::{AppState, SessionEntry};
use super::{ApiError, SessionSummary, api_error, with_session};

/// POST /api/sessions - Start an empty session.
pub async fn create(State(state): State<Arc<AppState>>) -> (StatusCode, Json<SessionSummary>) {
    let id = Uuid::new_v4();
    let entry = SessionEntry::new();
    let summary = SessionSummary::new(&id.to_string(), &entry.session);

    state.sessions.write().await.insert(id, entry);
    info!(session = %id, "created session");

    (StatusCode::CREATED, Json(summary))
}

/// GET /api/sessions/:id - Current phase, config and image info.
pub async fn show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>, ApiError> {
    let summary = with_session(&state, &id, |s| SessionSummary::new(&id, s)).await?;
    Ok(Json(summary))
}

/// GET /api/sessions/:id/config
pub async fn get_config(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WatermarkConfig>, ApiError> {
    let config = with_session(&state, &id, |s| s.config().clone()).await?;
    Ok(Json(config))
}

/// PUT /api/sessions/:id/config - Replace the watermark configuration.
pub async fn put_config(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(config): Json<WatermarkConfig>,
) -> Result<Json<WatermarkConfig>, ApiError> {
    let updated = with_session(&state, &id, |s| {
        s.update_config(config).map(|_| s.config().clone())
    })
    .await?
    .map_err(api_error)?;
    Ok(Json(updated))
}

/// GET /api/sessions/:id/notifications - Drain pending notifications.
pub async fn notifications(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let notes = with_session(&state, &id, |s| s.take_notifications()).await?;
    Ok(Json(notes))
}
