//! Font faces for watermark text.
//!
//! Two faces are available:
//!
//! - **Built-in**: the Spleen 12×24 bitmap font, resampled to the requested
//!   pixel size. Always available, needs no files on disk.
//! - **TrueType**: any TTF/OTF file, rasterized with `ab_glyph` into an
//!   anti-aliased coverage buffer.
//!
//! `measure` and `rasterize` share one layout routine per face, so the
//! stride computed from a measurement always matches the drawn glyphs.

use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont};
use image::{GrayImage, Luma, imageops::FilterType};
use spleen_font::{FONT_12X24, PSF2Font};
use std::fmt;
use std::path::Path;

use crate::error::WatermarkError;

/// Native Spleen cell size.
const CELL_WIDTH: usize = 12;
const CELL_HEIGHT: usize = 24;

/// Size of a laid-out line of text, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    pub width: f32,
    pub line_height: f32,
}

/// Rendered text as a coverage buffer.
#[derive(Debug, Clone)]
pub struct GlyphMask {
    pub width: usize,
    pub height: usize,
    /// Coverage values: 0.0 = empty, 1.0 = fully inked, row-major.
    pub data: Vec<f32>,
}

impl GlyphMask {
    fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            data: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Bilinear sample at a fractional position; zero outside the mask.
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let x = x - 0.5;
        let y = y - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let at = |px: i64, py: i64| -> f32 {
            if px < 0 || py < 0 || px >= self.width as i64 || py >= self.height as i64 {
                0.0
            } else {
                self.data[py as usize * self.width + px as usize]
            }
        };

        at(x0, y0) * (1.0 - fx) * (1.0 - fy)
            + at(x0 + 1, y0) * fx * (1.0 - fy)
            + at(x0, y0 + 1) * (1.0 - fx) * fy
            + at(x0 + 1, y0 + 1) * fx * fy
    }
}

/// A font used to measure and draw watermark text.
#[derive(Clone, Default)]
pub enum FontFace {
    #[default]
    Builtin,
    TrueType(FontArc),
}

impl fmt::Debug for FontFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontFace::Builtin => write!(f, "FontFace::Builtin"),
            FontFace::TrueType(_) => write!(f, "FontFace::TrueType"),
        }
    }
}

impl FontFace {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, WatermarkError> {
        FontArc::try_from_vec(bytes)
            .map(FontFace::TrueType)
            .map_err(|e| WatermarkError::Font(format!("Invalid font data: {}", e)))
    }

    pub fn from_file(path: &Path) -> Result<Self, WatermarkError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes)
            .map_err(|e| WatermarkError::Font(format!("{}: {}", path.display(), e)))
    }

    pub fn name(&self) -> &'static str {
        match self {
            FontFace::Builtin => "spleen-12x24",
            FontFace::TrueType(_) => "truetype",
        }
    }

    /// Measure a single line of text at the given pixel size.
    pub fn measure(&self, text: &str, pixel_size: f32) -> TextMetrics {
        match self {
            FontFace::Builtin => builtin_metrics(text, pixel_size),
            FontFace::TrueType(font) => {
                let (_, metrics) = ttf_layout(font, text, pixel_size);
                metrics
            }
        }
    }

    /// Rasterize a single line of text. The mask is exactly
    /// `ceil(width) × ceil(line_height)` of the matching measurement.
    pub fn rasterize(&self, text: &str, pixel_size: f32) -> Result<GlyphMask, WatermarkError> {
        if text.is_empty() {
            return Ok(GlyphMask::empty());
        }
        match self {
            FontFace::Builtin => rasterize_builtin(text, pixel_size),
            FontFace::TrueType(font) => Ok(rasterize_ttf(font, text, pixel_size)),
        }
    }
}

fn builtin_metrics(text: &str, pixel_size: f32) -> TextMetrics {
    let chars = text.chars().count() as f32;
    TextMetrics {
        width: chars * pixel_size * CELL_WIDTH as f32 / CELL_HEIGHT as f32,
        line_height: pixel_size,
    }
}

/// Draw the text at native cell size, then resample to the target size.
fn rasterize_builtin(text: &str, pixel_size: f32) -> Result<GlyphMask, WatermarkError> {
    let chars: Vec<char> = text.chars().collect();
    let native_width = (chars.len() * CELL_WIDTH) as u32;
    let mut native = GrayImage::new(native_width, CELL_HEIGHT as u32);

    let mut spleen = PSF2Font::new(FONT_12X24)
        .map_err(|_| WatermarkError::Font("Failed to load built-in Spleen font".to_string()))?;

    for (i, ch) in chars.iter().enumerate() {
        let origin_x = i * CELL_WIDTH;
        if ch.is_whitespace() {
            continue;
        }
        let utf8 = ch.to_string();
        match spleen.glyph_for_utf8(utf8.as_bytes()) {
            Some(glyph) => {
                for (row_y, row) in glyph.enumerate() {
                    for (col_x, on) in row.enumerate() {
                        if on && row_y < CELL_HEIGHT && col_x < CELL_WIDTH {
                            native.put_pixel((origin_x + col_x) as u32, row_y as u32, Luma([255]));
                        }
                    }
                }
            }
            None => draw_missing_glyph(&mut native, origin_x),
        }
    }

    let metrics = builtin_metrics(text, pixel_size);
    let width = (metrics.width.ceil() as u32).max(1);
    let height = (metrics.line_height.ceil() as u32).max(1);
    let resized = image::imageops::resize(&native, width, height, FilterType::Triangle);

    Ok(GlyphMask {
        width: width as usize,
        height: height as usize,
        data: resized.pixels().map(|p| p.0[0] as f32 / 255.0).collect(),
    })
}

/// Box outline for characters the bitmap font lacks.
fn draw_missing_glyph(img: &mut GrayImage, origin_x: usize) {
    let (left, right) = (origin_x + 1, origin_x + CELL_WIDTH - 2);
    let (top, bottom) = (4usize, CELL_HEIGHT - 3);
    for x in left..=right {
        img.put_pixel(x as u32, top as u32, Luma([255]));
        img.put_pixel(x as u32, bottom as u32, Luma([255]));
    }
    for y in top..=bottom {
        img.put_pixel(left as u32, y as u32, Luma([255]));
        img.put_pixel(right as u32, y as u32, Luma([255]));
    }
}

/// Glyph positions along the baseline plus the resulting line metrics.
fn ttf_layout(font: &FontArc, text: &str, pixel_size: f32) -> (Vec<(GlyphId, f32)>, TextMetrics) {
    let scale = PxScale::from(pixel_size);
    let scaled = font.as_scaled(scale);

    let mut glyphs = Vec::new();
    let mut caret_x = 0.0f32;
    let mut prev: Option<GlyphId> = None;

    for ch in text.chars() {
        let glyph_id = scaled.glyph_id(ch);
        if let Some(prev) = prev {
            caret_x += scaled.kern(prev, glyph_id);
        }
        glyphs.push((glyph_id, caret_x));
        caret_x += scaled.h_advance(glyph_id);
        prev = Some(glyph_id);
    }

    let metrics = TextMetrics {
        width: caret_x.max(0.0),
        line_height: scaled.ascent() - scaled.descent(),
    };
    (glyphs, metrics)
}

fn rasterize_ttf(font: &FontArc, text: &str, pixel_size: f32) -> GlyphMask {
    let (glyphs, metrics) = ttf_layout(font, text, pixel_size);
    let scale = PxScale::from(pixel_size);
    let baseline_y = font.as_scaled(scale).ascent();

    let width = (metrics.width.ceil() as usize).max(1);
    let height = (metrics.line_height.ceil() as usize).max(1);
    let mut data = vec![0.0f32; width * height];

    for (glyph_id, glyph_x) in glyphs {
        let glyph = glyph_id.with_scale_and_position(scale, ab_glyph::point(glyph_x, baseline_y));

        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = px as i32 + bounds.min.x as i32;
                let y = py as i32 + bounds.min.y as i32;

                if x >= 0 && x < width as i32 && y >= 0 && y < height as i32 {
                    let idx = y as usize * width + x as usize;
                    data[idx] = (data[idx] + coverage).min(1.0);
                }
            });
        }
    }

    GlyphMask {
        width,
        height,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_measure_scales_with_size() {
        let face = FontFace::Builtin;
        let small = face.measure("Watermark", 12.0);
        let large = face.measure("Watermark", 48.0);
        assert_eq!(small.width, 54.0);
        assert_eq!(small.line_height, 12.0);
        assert_eq!(large.width, 216.0);
        assert_eq!(large.line_height, 48.0);
    }

    #[test]
    fn test_builtin_mask_matches_measurement() {
        let face = FontFace::Builtin;
        for size in [12.0, 24.0, 37.0, 200.0] {
            let metrics = face.measure("Watermark", size);
            let mask = face.rasterize("Watermark", size).unwrap();
            assert_eq!(mask.width, metrics.width.ceil() as usize);
            assert_eq!(mask.height, metrics.line_height.ceil() as usize);
            assert_eq!(mask.data.len(), mask.width * mask.height);
        }
    }

    #[test]
    fn test_builtin_renders_ink() {
        let mask = FontFace::Builtin.rasterize("Hello", 24.0).unwrap();
        assert!(mask.data.iter().any(|&v| v > 0.5));
        assert!(mask.data.iter().any(|&v| v == 0.0));
    }

    #[test]
    fn test_builtin_upscale_is_antialiased() {
        let mask = FontFace::Builtin.rasterize("Smooth", 100.0).unwrap();
        let has_intermediate = mask.data.iter().any(|&v| v > 0.01 && v < 0.99);
        assert!(has_intermediate, "Upscaled bitmap text should have soft edges");
    }

    #[test]
    fn test_builtin_whitespace_is_blank() {
        let mask = FontFace::Builtin.rasterize("   ", 24.0).unwrap();
        assert_eq!(mask.width, 36);
        assert!(mask.data.iter().all(|&v| v == 0.0));
    }

    const DEJAVU_BOLD: &[u8] = include_bytes!("../tests/fonts/DejaVuSerifCondensed-Bold.ttf");

    fn truetype() -> FontFace {
        FontFace::from_bytes(DEJAVU_BOLD.to_vec()).unwrap()
    }

    #[test]
    fn test_truetype_mask_matches_measurement() {
        let face = truetype();
        assert_eq!(face.name(), "truetype");
        for size in [12.0, 24.0, 37.5, 200.0] {
            let metrics = face.measure("Watermark", size);
            let mask = face.rasterize("Watermark", size).unwrap();
            assert!(metrics.width > 0.0);
            assert_eq!(mask.width, metrics.width.ceil() as usize);
            assert_eq!(mask.height, metrics.line_height.ceil() as usize);
            assert_eq!(mask.data.len(), mask.width * mask.height);
        }
    }

    #[test]
    fn test_truetype_renders_antialiased_ink() {
        let mask = truetype().rasterize("Draft", 48.0).unwrap();
        assert!(!mask.is_empty());
        assert!(mask.data.iter().any(|&v| v > 0.9));
        assert!(mask.data.iter().any(|&v| v > 0.05 && v < 0.95));
        assert!(mask.data.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_truetype_applies_kerning() {
        let face = truetype();
        let pair = face.measure("AV", 48.0).width;
        let apart = face.measure("A", 48.0).width + face.measure("V", 48.0).width;
        assert!(apart - pair > 0.5, "AV {} vs A+V {}", pair, apart);
    }

    #[test]
    fn test_truetype_size_scales_metrics() {
        let face = truetype();
        let small = face.measure("Watermark", 20.0);
        let large = face.measure("Watermark", 40.0);
        assert!((large.width - 2.0 * small.width).abs() < 0.01);
        assert!((large.line_height - 2.0 * small.line_height).abs() < 0.01);
    }

    #[test]
    fn test_truetype_from_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fonts/DejaVuSerifCondensed-Bold.ttf");
        let face = FontFace::from_file(&path).unwrap();
        assert!(matches!(face, FontFace::TrueType(_)));
        assert!(face.rasterize("", 24.0).unwrap().is_empty());
    }

    #[test]
    fn test_empty_text() {
        let face = FontFace::Builtin;
        assert_eq!(face.measure("", 24.0).width, 0.0);
        assert!(face.rasterize("", 24.0).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_font_bytes() {
        let err = FontFace::from_bytes(b"not a font".to_vec()).unwrap_err();
        assert!(matches!(err, WatermarkError::Font(_)));
    }

    #[test]
    fn test_missing_font_file() {
        let err = FontFace::from_file(Path::new("/nonexistent/font.ttf")).unwrap_err();
        assert!(matches!(err, WatermarkError::Io(_)));
    }

    #[test]
    fn test_sample_bilinear() {
        let mask = GlyphMask {
            width: 2,
            height: 1,
            data: vec![0.0, 1.0],
        };
        assert_eq!(mask.sample(0.5, 0.5), 0.0);
        assert_eq!(mask.sample(1.5, 0.5), 1.0);
        assert!((mask.sample(1.0, 0.5) - 0.5).abs() < 1e-6);
        assert_eq!(mask.sample(-5.0, 0.5), 0.0);
    }
}
