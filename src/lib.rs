//! # Watermark Pro - Tiled Text Watermarks
//!
//! Watermark Pro overlays a repeating, rotated line of text across an image
//! and exports the result as PNG. It provides:
//!
//! - **Image loading**: media-type validation and decoding
//! - **Tiling compositor**: rotation-safe tile layout and anti-aliased text
//! - **Export**: PNG encoding at native or doubled resolution
//! - **Sessions**: the upload / reset / export state machine behind the web UI
//! - **Web UI**: a local single-page tool served over HTTP
//!
//! ## Quick Start
//!
//! ```no_run
//! use watermark_pro::{
//!     FontFace, WatermarkConfig,
//!     loader,
//!     render::export::{self, ExportScale},
//! };
//!
//! let bytes = std::fs::read("photo.jpg")?;
//! let source = loader::load_image(&bytes, Some("image/jpeg"), "photo.jpg")?;
//!
//! let config = WatermarkConfig {
//!     content: "CONFIDENTIAL".to_string(),
//!     ..WatermarkConfig::default()
//! };
//!
//! let download = export::export(
//!     &source.image,
//!     &config,
//!     &FontFace::Builtin,
//!     ExportScale::Native,
//!     chrono::Utc::now().timestamp_millis(),
//! )?;
//! std::fs::write(&download.filename, &download.bytes)?;
//!
//! # Ok::<(), watermark_pro::error::WatermarkError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Watermark parameters and their ranges |
//! | [`color`] | CSS-style color parsing |
//! | [`font`] | Built-in bitmap and TrueType faces |
//! | [`loader`] | Upload validation and decoding |
//! | [`render`] | Tile layout, compositing, export |
//! | [`session`] | Per-user state machine |
//! | [`server`] | HTTP server and embedded UI |
//! | [`error`] | Error types |

pub mod color;
pub mod config;
pub mod error;
pub mod font;
pub mod loader;
pub mod render;
pub mod server;
pub mod session;

// Re-exports for convenience
pub use color::Color;
pub use config::WatermarkConfig;
pub use error::WatermarkError;
pub use font::FontFace;
pub use loader::SourceImage;
pub use session::Session;
