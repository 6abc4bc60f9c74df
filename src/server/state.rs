//! Server state and configuration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::WatermarkError;
use crate::font::FontFace;
use crate::session::Session;

/// Idle time after which a session is dropped.
pub const SESSION_EXPIRATION_SECS: u64 = 3600;

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "127.0.0.1:8080")
    pub listen_addr: String,
    /// TrueType font for watermark text; the built-in bitmap font when unset
    pub font_path: Option<PathBuf>,
    /// Idle time before a session is swept
    pub session_ttl: Duration,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            font_path: None,
            session_ttl: Duration::from_secs(SESSION_EXPIRATION_SECS),
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

/// A session plus the bookkeeping needed to expire it.
#[derive(Debug)]
pub struct SessionEntry {
    pub session: Session,
    pub last_accessed: Instant,
}

impl SessionEntry {
    pub fn new() -> Self {
        Self {
            session: Session::new(),
            last_accessed: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }
}

impl Default for SessionEntry {
    fn default() -> Self {
        Self::new()
    }
}

/// Application state shared across handlers.
pub struct AppState {
    pub config: ServerConfig,
    pub font: FontFace,
    pub sessions: RwLock<HashMap<Uuid, SessionEntry>>,
    /// Unix timestamp of server boot for cache busting.
    pub boot_time: u64,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Self, WatermarkError> {
        let font = match &config.font_path {
            Some(path) => FontFace::from_file(path)?,
            None => FontFace::Builtin,
        };
        let boot_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Ok(Self {
            config,
            font,
            sessions: RwLock::new(HashMap::new()),
            boot_time,
        })
    }

    /// Drop sessions idle for longer than the configured TTL. Returns how
    /// many were removed.
    pub async fn sweep_expired(&self, now: Instant) -> usize {
        let ttl = self.config.session_ttl;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_accessed) < ttl);
        before - sessions.len()
    }
}
