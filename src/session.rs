//! # Session State
//!
//! One user's working state: the current watermark configuration, at most
//! one loaded image, and the notifications waiting to be shown.
//!
//! ```text
//!            load ok                 begin_export
//!   Empty ───────────▶ HasImage ─────────────────▶ Exporting
//!    ▲ ▲                │    ▲                         │
//!    │ └──── reset ─────┘    └──── finish_export ──────┘
//!    └─────────────────── reset ───────────────────────┘
//! ```
//!
//! An export works on a snapshot ([`ExportJob`]) taken when it begins, so a
//! second export, a config edit, or even a reset while it runs cannot touch
//! the image it is encoding. A reset always lands in `Empty`; exports still
//! running finish in the background and only report their notification. Failed loads and failed exports leave the
//! state exactly as it was and raise one error notification each.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::config::WatermarkConfig;
use crate::error::WatermarkError;
use crate::font::FontFace;
use crate::loader::{self, SourceImage};
use crate::render::export::{self, Download, ExportScale};

/// Coarse application state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Empty,
    HasImage,
    Exporting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// Everything one export needs, detached from the session.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub image: Arc<SourceImage>,
    pub config: WatermarkConfig,
    pub scale: ExportScale,
}

impl ExportJob {
    pub fn run(&self, font: &FontFace, timestamp_ms: i64) -> Result<Download, WatermarkError> {
        export::export(&self.image.image, &self.config, font, self.scale, timestamp_ms)
    }
}

#[derive(Debug, Default)]
pub struct Session {
    config: WatermarkConfig,
    image: Option<Arc<SourceImage>>,
    exports_in_flight: usize,
    notifications: VecDeque<Notification>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        match (&self.image, self.exports_in_flight) {
            (None, _) => Phase::Empty,
            (Some(_), 0) => Phase::HasImage,
            (Some(_), _) => Phase::Exporting,
        }
    }

    pub fn config(&self) -> &WatermarkConfig {
        &self.config
    }

    pub fn image(&self) -> Option<&Arc<SourceImage>> {
        self.image.as_ref()
    }

    /// Exports begun and not yet finished, including ones outliving a reset.
    pub fn exports_in_flight(&self) -> usize {
        self.exports_in_flight
    }

    /// Validate and decode a file, replacing any loaded image on success.
    pub fn load(
        &mut self,
        bytes: &[u8],
        declared_type: Option<&str>,
        filename: &str,
    ) -> Result<(), WatermarkError> {
        self.accept_upload(loader::load_image(bytes, declared_type, filename))
    }

    /// Apply the outcome of decoding an upload. A decoded image replaces the
    /// current one; an error leaves the image alone and queues exactly one
    /// error notification.
    pub fn accept_upload(
        &mut self,
        decoded: Result<SourceImage, WatermarkError>,
    ) -> Result<(), WatermarkError> {
        match decoded {
            Ok(source) => {
                self.image = Some(Arc::new(source));
                Ok(())
            }
            Err(e) => {
                self.notify(Notification::error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Drop the loaded image.
    pub fn reset(&mut self) {
        self.image = None;
    }

    /// Replace the configuration if it validates.
    pub fn update_config(&mut self, config: WatermarkConfig) -> Result<(), WatermarkError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Snapshot the state for an export. `None` when there is no image,
    /// in which case nothing is exported and nothing is reported.
    pub fn begin_export(&mut self, scale: ExportScale) -> Option<ExportJob> {
        let image = self.image.clone()?;
        self.exports_in_flight += 1;
        Some(ExportJob {
            image,
            config: self.config.clone(),
            scale,
        })
    }

    /// Record the outcome of a job started with [`Session::begin_export`].
    pub fn finish_export(&mut self, result: &Result<Download, WatermarkError>) {
        self.exports_in_flight = self.exports_in_flight.saturating_sub(1);
        match result {
            Ok(download) => {
                self.notify(Notification::success(format!("Saved {}", download.filename)))
            }
            Err(e) => self.notify(Notification::error(format!("Export failed: {}", e))),
        }
    }

    /// Run a whole export synchronously.
    pub fn export(
        &mut self,
        font: &FontFace,
        scale: ExportScale,
        timestamp_ms: i64,
    ) -> Option<Result<Download, WatermarkError>> {
        let job = self.begin_export(scale)?;
        let result = job.run(font, timestamp_ms);
        self.finish_export(&result);
        Some(result)
    }

    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push_back(notification);
    }

    /// Drain pending notifications, oldest first.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 210, 220]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_starts_empty() {
        let session = Session::new();
        assert_eq!(session.phase(), Phase::Empty);
        assert_eq!(session.config(), &WatermarkConfig::default());
    }

    #[test]
    fn test_load_then_reset() {
        let mut session = Session::new();
        session.load(&png_bytes(40, 30), Some("image/png"), "a.png").unwrap();
        assert_eq!(session.phase(), Phase::HasImage);

        session.reset();
        assert_eq!(session.phase(), Phase::Empty);
        assert!(session.image().is_none());
        assert!(session.take_notifications().is_empty());
    }

    #[test]
    fn test_reset_releases_image() {
        let mut session = Session::new();
        session.load(&png_bytes(8, 8), Some("image/png"), "a.png").unwrap();
        let weak = Arc::downgrade(session.image().unwrap());
        session.reset();
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_non_image_raises_one_notification() {
        let mut session = Session::new();
        assert!(session.load(b"plain text", Some("text/plain"), "a.txt").is_err());
        assert_eq!(session.phase(), Phase::Empty);
        let notes = session.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Error);
    }

    #[test]
    fn test_failed_load_keeps_previous_image() {
        let mut session = Session::new();
        session.load(&png_bytes(10, 10), Some("image/png"), "a.png").unwrap();
        assert!(session.load(b"garbage", Some("image/png"), "b.png").is_err());
        assert_eq!(session.image().unwrap().filename, "a.png");
    }

    #[test]
    fn test_new_upload_replaces_image() {
        let mut session = Session::new();
        session.load(&png_bytes(10, 10), Some("image/png"), "a.png").unwrap();
        session.load(&png_bytes(20, 5), Some("image/png"), "b.png").unwrap();
        let image = session.image().unwrap();
        assert_eq!((image.filename.as_str(), image.width, image.height), ("b.png", 20, 5));
    }

    #[test]
    fn test_accept_upload_outcomes() {
        let mut session = Session::new();
        let decoded = loader::load_image(&png_bytes(12, 9), Some("image/png"), "a.png");
        session.accept_upload(decoded).unwrap();
        assert_eq!(session.phase(), Phase::HasImage);
        assert!(session.take_notifications().is_empty());

        let rejected = Err(WatermarkError::InvalidInput("Multipart error".to_string()));
        assert!(session.accept_upload(rejected).is_err());
        assert_eq!(session.image().unwrap().filename, "a.png");

        let notes = session.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Error);
        assert!(notes[0].message.contains("Multipart error"));
    }

    #[test]
    fn test_reset_during_export_reports_empty() {
        let mut session = Session::new();
        session.load(&png_bytes(8, 8), Some("image/png"), "a.png").unwrap();
        let job = session.begin_export(ExportScale::Native).unwrap();
        assert_eq!(session.phase(), Phase::Exporting);

        session.reset();
        assert_eq!(session.phase(), Phase::Empty);

        // A fresh upload while the old export runs is still mid-export
        session.load(&png_bytes(4, 4), Some("image/png"), "b.png").unwrap();
        assert_eq!(session.phase(), Phase::Exporting);

        session.finish_export(&job.run(&FontFace::Builtin, 1));
        assert_eq!(session.phase(), Phase::HasImage);
    }

    #[test]
    fn test_export_on_empty_is_noop() {
        let mut session = Session::new();
        assert!(session.export(&FontFace::Builtin, ExportScale::Native, 1).is_none());
        assert!(session.begin_export(ExportScale::Native).is_none());
        assert!(session.take_notifications().is_empty());
        assert_eq!(session.phase(), Phase::Empty);
    }

    #[test]
    fn test_double_export_keeps_image() {
        let mut session = Session::new();
        session.load(&png_bytes(40, 30), Some("image/png"), "a.png").unwrap();
        let before = Arc::clone(session.image().unwrap());

        let first = session.export(&FontFace::Builtin, ExportScale::Native, 1).unwrap().unwrap();
        let second = session.export(&FontFace::Builtin, ExportScale::Native, 2).unwrap().unwrap();

        assert_eq!(first.bytes, second.bytes);
        assert_eq!(second.filename, "watermark-2.png");
        assert!(Arc::ptr_eq(&before, session.image().unwrap()));
        assert_eq!(session.phase(), Phase::HasImage);

        let notes = session.take_notifications();
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().all(|n| n.level == NotificationLevel::Success));
    }

    #[test]
    fn test_overlapping_exports_are_independent() {
        let mut session = Session::new();
        session.load(&png_bytes(16, 16), Some("image/png"), "a.png").unwrap();

        let a = session.begin_export(ExportScale::Native).unwrap();
        let b = session.begin_export(ExportScale::Double).unwrap();
        assert_eq!(session.phase(), Phase::Exporting);

        // Reset while both are in flight; the jobs keep their snapshot
        session.reset();
        assert_eq!(session.phase(), Phase::Empty);
        assert_eq!(session.exports_in_flight(), 2);

        let ra = a.run(&FontFace::Builtin, 1);
        let rb = b.run(&FontFace::Builtin, 2);
        session.finish_export(&ra);
        session.finish_export(&rb);
        assert_eq!(session.phase(), Phase::Empty);
        assert_eq!(session.exports_in_flight(), 0);
        assert_eq!(session.take_notifications().len(), 2);

        assert_eq!(ra.unwrap().width, 16);
        assert_eq!(rb.unwrap().width, 32);
    }

    #[test]
    fn test_failed_export_reports_and_keeps_state() {
        let mut session = Session::new();
        session.load(&png_bytes(8, 8), Some("image/png"), "a.png").unwrap();
        let _job = session.begin_export(ExportScale::Native).unwrap();
        session.finish_export(&Err(WatermarkError::Encode("no data".to_string())));

        assert_eq!(session.phase(), Phase::HasImage);
        let notes = session.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Error);
        assert!(notes[0].message.contains("no data"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut session = Session::new();
        let mut config = WatermarkConfig::default();
        config.font_size = 500.0;
        assert!(session.update_config(config).is_err());
        assert_eq!(session.config().font_size, 24.0);

        let mut config = WatermarkConfig::default();
        config.content = "Confidential".to_string();
        session.update_config(config).unwrap();
        assert_eq!(session.config().content, "Confidential");
    }
}
