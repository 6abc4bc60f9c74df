//! HTTP handlers for the server.

pub mod image;
pub mod render;
pub mod sessions;

use axum::http::StatusCode;
use serde::Serialize;
use uuid::Uuid;

use crate::config::WatermarkConfig;
use crate::error::WatermarkError;
use crate::session::{Phase, Session};

use super::state::AppState;

pub type ApiError = (StatusCode, String);

/// HTTP status for a library error.
pub fn status_for(err: &WatermarkError) -> StatusCode {
    match err {
        WatermarkError::InvalidInput(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        WatermarkError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        WatermarkError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WatermarkError::Config(_) => StatusCode::BAD_REQUEST,
        WatermarkError::Encode(_) | WatermarkError::Font(_) | WatermarkError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub fn api_error(err: WatermarkError) -> ApiError {
    (status_for(&err), err.to_string())
}

fn parse_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| (StatusCode::BAD_REQUEST, "Invalid session ID".to_string()))
}

/// Run `f` against a live session, refreshing its expiry.
async fn with_session<T>(
    state: &AppState,
    id: &str,
    f: impl FnOnce(&mut Session) -> T,
) -> Result<T, ApiError> {
    let session_id = parse_id(id)?;
    let mut sessions = state.sessions.write().await;
    let entry = sessions
        .get_mut(&session_id)
        .ok_or((StatusCode::NOT_FOUND, "Session not found or expired".to_string()))?;
    entry.touch();
    Ok(f(&mut entry.session))
}

#[derive(Debug, Serialize)]
pub struct ImageInfo {
    pub filename: String,
    pub width: u32,
    pub height: u32,
}

/// Session state as reported to the UI.
#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub phase: Phase,
    pub config: WatermarkConfig,
    pub image: Option<ImageInfo>,
}

impl SessionSummary {
    fn new(id: &str, session: &Session) -> Self {
        Self {
            id: id.to_string(),
            phase: session.phase(),
            config: session.config().clone(),
            image: session.image().map(|img| ImageInfo {
                filename: img.filename.clone(),
                width: img.width,
                height: img.height,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&WatermarkError::InvalidInput(String::new())),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            status_for(&WatermarkError::TooLarge(String::new())),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status_for(&WatermarkError::Decode(String::new())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&WatermarkError::Config(String::new())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&WatermarkError::Encode(String::new())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_parse_id() {
        assert!(parse_id("not-a-uuid").is_err());
        assert!(parse_id(&Uuid::new_v4().to_string()).is_ok());
    }
}
