//! Video window and audio segment planning
//!
//! Both modalities cut a 1-D index range (frames or samples) into
//! overlapping half-open spans `[start, end)`.

use super::ChunkPlan;
use serde::{Deserialize, Serialize};

/// Frames per video window upper bound
pub const VIDEO_WINDOW_FRAMES: i64 = 8;
/// Frames shared by consecutive video windows
pub const VIDEO_WINDOW_OVERLAP: i64 = 2;

/// Audio segment size bounds, in samples
pub const AUDIO_MIN_SEGMENT: i64 = 4096;
pub const AUDIO_MAX_SEGMENT: i64 = 48_000;
/// Samples shared by consecutive audio segments
pub const AUDIO_SEGMENT_OVERLAP: i64 = 2048;

/// Half-open index interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: i64,
    pub end: i64,
}

impl Span {
    pub fn len(&self) -> i64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Walk `[0, total)` in steps of `plan.stride()`, clipping the last span
fn plan_spans(total: i64, plan: ChunkPlan) -> Vec<Span> {
    let stride = plan.stride();
    let mut spans = Vec::new();
    let mut start = 0;
    while start < total {
        spans.push(Span {
            start,
            end: total.min(start + plan.chunk_size),
        });
        start += stride;
    }
    spans
}

/// Frame window planner
#[derive(Debug, Clone, Copy, Default)]
pub struct VideoEngine;

impl VideoEngine {
    /// Window = `max(1, min(frame_count, 8))` frames, overlap 2
    pub fn plan_chunks(&self, frame_count: i64) -> ChunkPlan {
        ChunkPlan::new(frame_count.min(VIDEO_WINDOW_FRAMES).max(1), VIDEO_WINDOW_OVERLAP)
    }

    pub fn plan_windows(&self, frame_count: i64) -> Vec<Span> {
        plan_spans(frame_count, self.plan_chunks(frame_count))
    }
}

/// Sample segment planner
#[derive(Debug, Clone, Copy, Default)]
pub struct AudioEngine;

impl AudioEngine {
    /// Segment = `max(4096, min(sample_count, 48000))` samples, overlap 2048
    pub fn plan_chunks(&self, sample_count: i64) -> ChunkPlan {
        ChunkPlan::new(
            sample_count.min(AUDIO_MAX_SEGMENT).max(AUDIO_MIN_SEGMENT),
            AUDIO_SEGMENT_OVERLAP,
        )
    }

    pub fn plan_segments(&self, sample_count: i64) -> Vec<Span> {
        plan_spans(sample_count, self.plan_chunks(sample_count))
    }
}
