//! # Exporter
//!
//! Turns a source image and a watermark configuration into a PNG file ready
//! to hand to the user, at native or doubled resolution.

use image::{ImageFormat, RgbaImage, imageops::FilterType};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::info;

use super::compositor::Compositor;
use crate::config::WatermarkConfig;
use crate::error::WatermarkError;
use crate::font::FontFace;

/// Longest edge of a preview image.
pub const PREVIEW_MAX_DIM: u32 = 1152;

/// Output resolution relative to the source image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportScale {
    #[default]
    Native,
    Double,
}

impl ExportScale {
    pub fn factor(self) -> u32 {
        match self {
            ExportScale::Native => 1,
            ExportScale::Double => 2,
        }
    }
}

impl TryFrom<u32> for ExportScale {
    type Error = WatermarkError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ExportScale::Native),
            2 => Ok(ExportScale::Double),
            n => Err(WatermarkError::Config(format!(
                "Export scale must be 1 or 2, got {}",
                n
            ))),
        }
    }
}

/// An encoded image ready to be saved or sent.
#[derive(Debug, Clone)]
pub struct Download {
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// `watermark-<unix-ms>.png`
pub fn download_filename(timestamp_ms: i64) -> String {
    format!("watermark-{}.png", timestamp_ms)
}

/// Encode an RGBA raster as PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, WatermarkError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| WatermarkError::Encode(format!("Failed to encode PNG: {}", e)))?;

    if bytes.is_empty() {
        return Err(WatermarkError::Encode("PNG encoder produced no data".to_string()));
    }
    Ok(bytes)
}

/// Composite the watermark at the requested resolution.
///
/// At `Double`, the source is upscaled and every watermark length is doubled
/// so the pattern lines up with the native rendering.
pub fn render_export(
    source: &RgbaImage,
    config: &WatermarkConfig,
    font: &FontFace,
    scale: ExportScale,
) -> Result<RgbaImage, WatermarkError> {
    let compositor = Compositor::new(font);
    match scale {
        ExportScale::Native => compositor.composite(source, config),
        ExportScale::Double => {
            let factor = scale.factor();
            let mut upscaled = image::imageops::resize(
                source,
                source.width() * factor,
                source.height() * factor,
                FilterType::Lanczos3,
            );
            compositor.draw(&mut upscaled, &config.scaled(factor as f32))?;
            Ok(upscaled)
        }
    }
}

/// Render, encode and name one export.
pub fn export(
    source: &RgbaImage,
    config: &WatermarkConfig,
    font: &FontFace,
    scale: ExportScale,
    timestamp_ms: i64,
) -> Result<Download, WatermarkError> {
    let raster = render_export(source, config, font, scale)?;
    let bytes = encode_png(&raster)?;
    let download = Download {
        filename: download_filename(timestamp_ms),
        width: raster.width(),
        height: raster.height(),
        bytes,
    };

    info!(
        filename = %download.filename,
        width = download.width,
        height = download.height,
        size = download.bytes.len(),
        "exported watermarked image"
    );
    Ok(download)
}

/// Composite a size-limited preview and encode it as PNG.
///
/// The source is shrunk so its longest edge is at most `max_dim`, and the
/// watermark is shrunk with it, so the preview looks like the export.
pub fn preview_png(
    source: &RgbaImage,
    config: &WatermarkConfig,
    font: &FontFace,
    max_dim: u32,
) -> Result<Vec<u8>, WatermarkError> {
    let (width, height) = source.dimensions();
    let longest = width.max(height);

    let raster = if longest > max_dim {
        let scale = max_dim as f32 / longest as f32;
        let new_width = ((width as f32 * scale).round() as u32).max(1);
        let new_height = ((height as f32 * scale).round() as u32).max(1);
        let mut small = image::imageops::resize(source, new_width, new_height, FilterType::Triangle);
        Compositor::new(font).draw(&mut small, &config.scaled(scale))?;
        small
    } else {
        Compositor::new(font).composite(source, config)?
    };

    encode_png(&raster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn source(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([240, 240, 240, 255]))
    }

    #[test]
    fn test_download_filename() {
        assert_eq!(download_filename(1_700_000_000_123), "watermark-1700000000123.png");
    }

    #[test]
    fn test_encode_png_has_signature() {
        let bytes = encode_png(&source(4, 4)).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_export_native_dimensions() {
        let download = export(
            &source(400, 300),
            &WatermarkConfig::default(),
            &FontFace::Builtin,
            ExportScale::Native,
            42,
        )
        .unwrap();
        assert_eq!(download.filename, "watermark-42.png");
        assert_eq!((download.width, download.height), (400, 300));
        let decoded = image::load_from_memory(&download.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (400, 300));
    }

    #[test]
    fn test_export_double_dimensions() {
        let download = export(
            &source(40, 30),
            &WatermarkConfig::default(),
            &FontFace::Builtin,
            ExportScale::Double,
            42,
        )
        .unwrap();
        assert_eq!((download.width, download.height), (80, 60));
    }

    #[test]
    fn test_scale_from_number() {
        assert_eq!(ExportScale::try_from(1).unwrap(), ExportScale::Native);
        assert_eq!(ExportScale::try_from(2).unwrap(), ExportScale::Double);
        assert!(ExportScale::try_from(3).is_err());
    }

    #[test]
    fn test_preview_is_bounded() {
        let png = preview_png(
            &source(2304, 100),
            &WatermarkConfig::default(),
            &FontFace::Builtin,
            PREVIEW_MAX_DIM,
        )
        .unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), 1152);
        assert_eq!(decoded.height(), 50);
    }

    #[test]
    fn test_preview_small_image_keeps_size() {
        let png = preview_png(
            &source(64, 48),
            &WatermarkConfig::default(),
            &FontFace::Builtin,
            PREVIEW_MAX_DIM,
        )
        .unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }
}
