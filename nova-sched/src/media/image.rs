//! Image tile planning

use super::ChunkPlan;
use serde::{Deserialize, Serialize};

/// Smallest tile edge the planner will choose
pub const MIN_TILE_SIZE: i64 = 128;

/// Overlap between neighbouring tiles, in pixels
pub const TILE_OVERLAP: i64 = 32;

/// One rectangular tile, clipped to the image extent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageTile {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

/// Raster tile planner
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageEngine;

impl ImageEngine {
    /// Tile edge = `max(128, min(width, height, tile_size))`, overlap 32
    pub fn plan_chunks(&self, width: i64, height: i64, tile_size: i64) -> ChunkPlan {
        let chunk_size = width.min(height).min(tile_size).max(MIN_TILE_SIZE);
        ChunkPlan::new(chunk_size, TILE_OVERLAP)
    }

    /// Raster scan (rows outer, columns inner) covering `[0,width) × [0,height)`
    ///
    /// Each tile is clipped to the remaining extent, so edge tiles may be
    /// narrower than the chunk size but never empty.
    pub fn plan_tiles(&self, width: i64, height: i64, tile_size: i64) -> Vec<ImageTile> {
        let plan = self.plan_chunks(width, height, tile_size);
        let step = plan.stride();
        let mut tiles = Vec::new();

        let mut y = 0;
        while y < height {
            let mut x = 0;
            while x < width {
                tiles.push(ImageTile {
                    x,
                    y,
                    width: plan.chunk_size.min(width - x),
                    height: plan.chunk_size.min(height - y),
                });
                x += step;
            }
            y += step;
        }
        tiles
    }
}
