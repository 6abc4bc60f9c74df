//! # Rendering Module
//!
//! Everything between a decoded image and a watermarked PNG.
//!
//! ## Modules
//!
//! - [`tiling`]: tile lattice layout with rotation-safe over-draw
//! - [`compositor`]: draws rotated text at every tile anchor
//! - [`export`]: PNG encoding, 2x export, previews, download names
//!
//! ## Usage Example
//!
//! ```
//! use image::{Rgba, RgbaImage};
//! use watermark_pro::{FontFace, WatermarkConfig};
//! use watermark_pro::render::compositor::Compositor;
//!
//! let source = RgbaImage::from_pixel(400, 300, Rgba([255, 255, 255, 255]));
//! let font = FontFace::Builtin;
//!
//! let marked = Compositor::new(&font)
//!     .composite(&source, &WatermarkConfig::default())
//!     .unwrap();
//! assert_eq!(marked.dimensions(), (400, 300));
//! ```

pub mod compositor;
pub mod export;
pub mod tiling;
