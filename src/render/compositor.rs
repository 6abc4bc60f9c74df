//! # Tiling Compositor
//!
//! Draws the watermark text over an RGBA surface at every anchor of a
//! [`TileGrid`]. The text is rasterized once into a coverage mask; each
//! tile then inverse-rotates destination pixels back into mask space and
//! samples it bilinearly, so rotated tiles stay smooth.
//!
//! Work is split into horizontal bands that render in parallel. Within a
//! band, tiles are blended in grid order, which keeps the output
//! deterministic regardless of thread count.

use image::RgbaImage;
use rayon::prelude::*;
use tracing::debug;

use super::tiling::{TileGrid, TilePattern, compute_grid};
use crate::color::Color;
use crate::config::WatermarkConfig;
use crate::error::WatermarkError;
use crate::font::{FontFace, GlyphMask};

/// Rows per parallel work unit.
const BAND_ROWS: usize = 32;

/// Pixel-space bounds of one tile, clipped to the surface (exclusive max).
#[derive(Debug, Clone, Copy)]
struct TileBounds {
    anchor_x: f32,
    anchor_y: f32,
    min_x: usize,
    max_x: usize,
    min_y: usize,
    max_y: usize,
}

/// Renders a watermark configuration with one font face.
#[derive(Debug, Clone, Copy)]
pub struct Compositor<'a> {
    font: &'a FontFace,
}

impl<'a> Compositor<'a> {
    pub fn new(font: &'a FontFace) -> Self {
        Self { font }
    }

    /// Tile layout for a `width × height` surface.
    pub fn grid(&self, width: u32, height: u32, config: &WatermarkConfig) -> TileGrid {
        let metrics = self.font.measure(&config.content, config.font_size);
        compute_grid(width, height, metrics, config)
    }

    /// Declarative description of the watermark for a preview overlay.
    pub fn pattern(&self, width: u32, height: u32, config: &WatermarkConfig) -> TilePattern {
        TilePattern::new(width, height, config, self.grid(width, height, config))
    }

    /// Return a copy of `source` with the watermark drawn over it.
    pub fn composite(
        &self,
        source: &RgbaImage,
        config: &WatermarkConfig,
    ) -> Result<RgbaImage, WatermarkError> {
        let mut target = source.clone();
        self.draw(&mut target, config)?;
        Ok(target)
    }

    /// Draw the watermark onto `target` in place. Returns the number of
    /// tiles that touched the surface.
    pub fn draw(
        &self,
        target: &mut RgbaImage,
        config: &WatermarkConfig,
    ) -> Result<usize, WatermarkError> {
        let (width, height) = target.dimensions();
        if config.is_blank() || width == 0 || height == 0 {
            return Ok(0);
        }

        let grid = self.grid(width, height, config);
        if grid.is_empty() {
            return Ok(0);
        }
        let mask = self.font.rasterize(&config.content, config.font_size)?;
        if mask.is_empty() {
            return Ok(0);
        }

        let (ex, ey) =
            TileGrid::rotated_half_extents(mask.width as f32, mask.height as f32, grid.rotation);
        let mut tiles: Vec<TileBounds> = grid
            .anchors
            .iter()
            .filter_map(|a| clip_tile(a.x, a.y, ex + 1.0, ey + 1.0, width, height))
            .collect();
        // Every tile has the same extent, so ordering by anchor row orders
        // both `min_y` and `max_y`. The sort is stable and keeps grid order
        // within a row.
        tiles.sort_by(|a, b| a.anchor_y.total_cmp(&b.anchor_y));

        let (sin, cos) = grid.rotation.to_radians().sin_cos();
        let stamp = Stamp {
            mask: &mask,
            color: config.color,
            cos,
            sin,
        };

        let row_bytes = width as usize * 4;
        let buffer: &mut [u8] = &mut **target;
        buffer
            .par_chunks_mut(row_bytes * BAND_ROWS)
            .enumerate()
            .for_each(|(band, chunk)| {
                let band_top = band * BAND_ROWS;
                let band_bottom = band_top + chunk.len() / row_bytes;
                for tile in band_tiles(&tiles, band_top, band_bottom) {
                    stamp.apply(chunk, row_bytes, band_top, band_bottom, tile);
                }
            });

        debug!(
            tiles = tiles.len(),
            width,
            height,
            mask_width = mask.width,
            mask_height = mask.height,
            "composited watermark"
        );

        Ok(tiles.len())
    }
}

fn clip_tile(
    anchor_x: f32,
    anchor_y: f32,
    half_w: f32,
    half_h: f32,
    width: u32,
    height: u32,
) -> Option<TileBounds> {
    let min_x = (anchor_x - half_w).floor().max(0.0);
    let max_x = (anchor_x + half_w).ceil().min(width as f32);
    let min_y = (anchor_y - half_h).floor().max(0.0);
    let max_y = (anchor_y + half_h).ceil().min(height as f32);
    if min_x >= max_x || min_y >= max_y {
        return None;
    }
    Some(TileBounds {
        anchor_x,
        anchor_y,
        min_x: min_x as usize,
        max_x: max_x as usize,
        min_y: min_y as usize,
        max_y: max_y as usize,
    })
}

/// Tiles overlapping rows `band_top..band_bottom`. `tiles` must be sorted by
/// anchor row.
fn band_tiles(tiles: &[TileBounds], band_top: usize, band_bottom: usize) -> &[TileBounds] {
    let start = tiles.partition_point(|t| t.max_y <= band_top);
    let end = tiles.partition_point(|t| t.min_y < band_bottom);
    if start < end { &tiles[start..end] } else { &[] }
}

/// The rotated text, ready to be blended at any anchor.
struct Stamp<'m> {
    mask: &'m GlyphMask,
    color: Color,
    cos: f32,
    sin: f32,
}

impl Stamp<'_> {
    fn apply(
        &self,
        chunk: &mut [u8],
        row_bytes: usize,
        band_top: usize,
        band_bottom: usize,
        tile: &TileBounds,
    ) {
        let half_w = self.mask.width as f32 / 2.0;
        let half_h = self.mask.height as f32 / 2.0;

        for y in tile.min_y.max(band_top)..tile.max_y.min(band_bottom) {
            let dy = y as f32 + 0.5 - tile.anchor_y;
            let row = &mut chunk[(y - band_top) * row_bytes..(y - band_top + 1) * row_bytes];
            for x in tile.min_x..tile.max_x {
                let dx = x as f32 + 0.5 - tile.anchor_x;
                // Inverse of a clockwise rotation in y-down space.
                let local_x = dx * self.cos + dy * self.sin;
                let local_y = -dx * self.sin + dy * self.cos;
                let coverage = self.mask.sample(local_x + half_w, local_y + half_h);
                if coverage <= 0.0 {
                    continue;
                }
                let px = &mut row[x * 4..x * 4 + 4];
                blend_over(px, self.color, coverage);
            }
        }
    }
}

/// Porter-Duff "over" of `color` (scaled by `coverage`) onto a straight-alpha pixel.
fn blend_over(pixel: &mut [u8], color: Color, coverage: f32) {
    let fg_alpha = (color.a * coverage).clamp(0.0, 1.0);
    let bg_alpha = pixel[3] as f32 / 255.0;
    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        pixel.copy_from_slice(&[0, 0, 0, 0]);
        return;
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    pixel[0] = blend_channel(color.r, pixel[0]);
    pixel[1] = blend_channel(color.g, pixel[1]);
    pixel[2] = blend_channel(color.b, pixel[2]);
    pixel[3] = (out_alpha * 255.0).round() as u8;
}
