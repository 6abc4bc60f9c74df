//! # Tile Grid
//!
//! Computes where watermark tiles go. Tiles sit on an infinite lattice
//!
//! ```text
//! anchor(i, j) = origin + (i * stride_x, j * stride_y)
//! stride_x     = text_width  + gap_x
//! stride_y     = line_height + gap_y
//! ```
//!
//! where `origin` is the configured offset reduced modulo the stride, so
//! anchors near the surface keep their precision. Each tile is drawn
//! centered on its anchor and rotated about it, so a tile can reach up to
//! half its diagonal away from the anchor in any direction.
//!
//! The grid keeps every lattice point within `stride + diagonal` of the
//! surface. That is more than one full tile past every edge, which is
//! enough for a tile at any rotation to reach into the surface if it can.

use serde::Serialize;
use tracing::debug;

use crate::color::Color;
use crate::config::WatermarkConfig;
use crate::font::TextMetrics;

/// Center point of one tile, in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TileAnchor {
    pub x: f32,
    pub y: f32,
}

/// Tile anchors covering a surface, plus the geometry used to place them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TileGrid {
    pub tile_width: f32,
    pub tile_height: f32,
    pub stride_x: f32,
    pub stride_y: f32,
    /// Clockwise rotation in degrees.
    pub rotation: f32,
    pub columns: usize,
    pub rows: usize,
    /// Anchors in row-major order.
    pub anchors: Vec<TileAnchor>,
}

impl TileGrid {
    fn empty(metrics: TextMetrics, rotation: f32) -> Self {
        Self {
            tile_width: metrics.width,
            tile_height: metrics.line_height,
            stride_x: 0.0,
            stride_y: 0.0,
            rotation,
            columns: 0,
            rows: 0,
            anchors: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Half width and half height of the axis-aligned box around one
    /// rotated tile of the given size.
    pub fn rotated_half_extents(width: f32, height: f32, rotation: f32) -> (f32, f32) {
        let (sin, cos) = rotation.to_radians().sin_cos();
        let (sin, cos) = (sin.abs(), cos.abs());
        (
            (width * cos + height * sin) / 2.0,
            (width * sin + height * cos) / 2.0,
        )
    }
}

/// Lay out tiles over a `width × height` surface.
///
/// `metrics` must come from the same font face and size that will draw the
/// tiles. Blank content, or a stride that collapses to zero, yields an
/// empty grid.
pub fn compute_grid(
    width: u32,
    height: u32,
    metrics: TextMetrics,
    config: &WatermarkConfig,
) -> TileGrid {
    if config.is_blank() {
        return TileGrid::empty(metrics, config.rotate);
    }

    let stride_x = metrics.width + config.gap[0];
    let stride_y = metrics.line_height + config.gap[1];
    if !(stride_x > 0.0 && stride_y > 0.0) {
        return TileGrid::empty(metrics, config.rotate);
    }

    let diagonal = metrics.width.hypot(metrics.line_height);
    let margin_x = stride_x + diagonal;
    let margin_y = stride_y + diagonal;
    let [offset_x, offset_y] = config.offset_or_zero();
    let origin_x = fold_into_period(offset_x, stride_x);
    let origin_y = fold_into_period(offset_y, stride_y);

    let first_col = ((-margin_x - origin_x) / stride_x).floor() as i64;
    let last_col = ((width as f32 + margin_x - origin_x) / stride_x).ceil() as i64;
    let first_row = ((-margin_y - origin_y) / stride_y).floor() as i64;
    let last_row = ((height as f32 + margin_y - origin_y) / stride_y).ceil() as i64;

    let columns = (last_col - first_col + 1).max(0) as usize;
    let rows = (last_row - first_row + 1).max(0) as usize;

    let mut anchors = Vec::with_capacity(columns * rows);
    for j in first_row..=last_row {
        let y = origin_y + j as f32 * stride_y;
        for i in first_col..=last_col {
            anchors.push(TileAnchor {
                x: origin_x + i as f32 * stride_x,
                y,
            });
        }
    }

    debug!(
        width,
        height,
        stride_x,
        stride_y,
        columns,
        rows,
        "computed tile grid"
    );

    TileGrid {
        tile_width: metrics.width,
        tile_height: metrics.line_height,
        stride_x,
        stride_y,
        rotation: config.rotate,
        columns,
        rows,
        anchors,
    }
}

/// Reduce a lattice origin to `[0, stride)`. The lattice is unchanged, and
/// anchors stay near the surface where `f32` still has sub-pixel precision.
fn fold_into_period(origin: f32, stride: f32) -> f32 {
    let folded = origin.rem_euclid(stride);
    if folded >= stride { 0.0 } else { folded }
}

/// Declarative description of a watermark over one surface, for a preview
/// overlay that draws the text itself instead of receiving pixels.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TilePattern {
    pub width: u32,
    pub height: u32,
    pub content: String,
    pub color: Color,
    pub font_size: f32,
    pub z_index: i32,
    pub grid: TileGrid,
}

impl TilePattern {
    pub fn new(width: u32, height: u32, config: &WatermarkConfig, grid: TileGrid) -> Self {
        Self {
            width,
            height,
            content: config.content.clone(),
            color: config.color,
            font_size: config.font_size,
            z_index: config.z_index,
            grid,
        }
    }
}
