//! Media chunk planners
//!
//! Turn raw workload dimensions into bounded work units:
//! - **image**: overlapping raster tiles over a width × height area
//! - **video**: overlapping frame windows
//! - **audio**: overlapping sample segments
//!
//! All planners are pure functions of their inputs. Zero or negative sizes
//! produce an empty unit sequence rather than an error.

pub mod image;
pub mod timeline;

pub use image::{ImageEngine, ImageTile};
pub use timeline::{AudioEngine, Span, VideoEngine};

use serde::{Deserialize, Serialize};

/// Chunk size and overlap chosen for one modality
///
/// Callers assume `overlap < chunk_size`; the stride is clamped to at least 1
/// regardless so a bad plan can never stall a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPlan {
    pub chunk_size: i64,
    pub overlap: i64,
}

impl ChunkPlan {
    pub fn new(chunk_size: i64, overlap: i64) -> Self {
        Self { chunk_size, overlap }
    }

    /// Distance between consecutive unit starts (always ≥ 1)
    pub fn stride(&self) -> i64 {
        (self.chunk_size - self.overlap).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stride() {
        assert_eq!(ChunkPlan::new(512, 32).stride(), 480);
        assert_eq!(ChunkPlan::new(8, 2).stride(), 6);
    }

    #[test]
    fn test_stride_never_below_one() {
        assert_eq!(ChunkPlan::new(1, 2).stride(), 1);
        assert_eq!(ChunkPlan::new(4, 4).stride(), 1);
    }
}
