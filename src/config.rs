//! Watermark parameters.
//!
//! `WatermarkConfig` is the single parameter set shared by the preview
//! overlay, the tiling compositor and the exporter. The field names
//! serialize in camelCase so the web form can post them unchanged.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::color::Color;
use crate::error::WatermarkError;

pub const MAX_CONTENT_CHARS: usize = 50;
pub const MIN_FONT_SIZE: f32 = 12.0;
pub const MAX_FONT_SIZE: f32 = 200.0;
pub const MIN_ROTATION: f32 = -180.0;
pub const MAX_ROTATION: f32 = 180.0;

/// Text watermark settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WatermarkConfig {
    /// Text drawn in every tile.
    pub content: String,
    pub color: Color,
    /// Font size in pixels.
    pub font_size: f32,
    /// Stacking order of the preview overlay. The raster has a single layer.
    pub z_index: i32,
    /// Clockwise rotation of each tile in degrees.
    pub rotate: f32,
    /// Horizontal and vertical space between tiles, in pixels.
    pub gap: [f32; 2],
    /// Shift of the whole grid, in pixels.
    pub offset: Option<[f32; 2]>,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            content: "Watermark".to_string(),
            color: Color::default(),
            font_size: 24.0,
            z_index: 9,
            rotate: -30.0,
            gap: [100.0, 100.0],
            offset: None,
        }
    }
}

impl WatermarkConfig {
    /// Load a preset from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, WatermarkError> {
        let text = std::fs::read_to_string(path)?;
        let config: WatermarkConfig = serde_json::from_str(&text).map_err(|e| {
            WatermarkError::Config(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<(), WatermarkError> {
        let chars = self.content.chars().count();
        if chars > MAX_CONTENT_CHARS {
            return Err(WatermarkError::Config(format!(
                "Content is {} characters, at most {} allowed",
                chars, MAX_CONTENT_CHARS
            )));
        }

        if !self.font_size.is_finite()
            || !(MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&self.font_size)
        {
            return Err(WatermarkError::Config(format!(
                "Font size {} outside {}-{}",
                self.font_size, MIN_FONT_SIZE, MAX_FONT_SIZE
            )));
        }

        if !self.rotate.is_finite() || !(MIN_ROTATION..=MAX_ROTATION).contains(&self.rotate) {
            return Err(WatermarkError::Config(format!(
                "Rotation {} outside {}..{} degrees",
                self.rotate, MIN_ROTATION, MAX_ROTATION
            )));
        }

        for (axis, gap) in ["x", "y"].iter().zip(self.gap) {
            if !gap.is_finite() || gap < 0.0 {
                return Err(WatermarkError::Config(format!(
                    "Gap {} must be a non-negative number, got {}",
                    axis, gap
                )));
            }
        }

        if let Some(offset) = self.offset {
            if offset.iter().any(|v| !v.is_finite()) {
                return Err(WatermarkError::Config("Offset must be finite".to_string()));
            }
        }

        if !(0.0..=1.0).contains(&self.color.a) {
            return Err(WatermarkError::Config(format!(
                "Color alpha {} outside 0-1",
                self.color.a
            )));
        }

        Ok(())
    }

    pub fn offset_or_zero(&self) -> [f32; 2] {
        self.offset.unwrap_or([0.0, 0.0])
    }

    /// True when there is nothing to draw.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty() || self.color.is_transparent()
    }

    /// Copy with every length multiplied by `factor`, for high-resolution export.
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            font_size: self.font_size * factor,
            gap: [self.gap[0] * factor, self.gap[1] * factor],
            offset: self.offset.map(|[x, y]| [x * factor, y * factor]),
            ..self.clone()
        }
    }
}
