//! Stream plan construction
//!
//! Infers workload sizes from a prompt graph and decomposes each modality
//! into work units. Missing or wrong-typed fields never fail planning; they
//! fall back to fixed defaults.

use crate::graph::{contains_keyword_node, int_input, node_inputs, number_input, PromptGraph};
use crate::media::{AudioEngine, ImageEngine, ImageTile, Span, VideoEngine};
use crate::profile::OptimizationSummary;
use serde::{Deserialize, Serialize};

pub const DEFAULT_IMAGE_EDGE: i64 = 1024;
/// Inferred image edges are raised to at least this
pub const MIN_IMAGE_EDGE: i64 = 64;
pub const DEFAULT_FRAME_COUNT: i64 = 24;
/// Eight minutes at 48 kHz
pub const DEFAULT_SAMPLE_COUNT: i64 = 48_000 * 8;

const FRAME_KEYS: [&str; 3] = ["frames", "num_frames", "frame_count"];

const IMAGE_KEYWORDS: [&str; 4] = ["ksampler", "sampler", "image", "latent"];
const VIDEO_KEYWORDS: [&str; 2] = ["video", "frame"];
const AUDIO_KEYWORDS: [&str; 3] = ["audio", "music", "spectrogram"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePlan {
    pub enabled: bool,
    pub width: i64,
    pub height: i64,
    pub tile_size: i64,
    pub tiles: Vec<ImageTile>,
    pub tile_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoPlan {
    pub enabled: bool,
    pub frame_count: i64,
    pub windows: Vec<Span>,
    pub window_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioPlan {
    pub enabled: bool,
    pub sample_count: i64,
    pub segments: Vec<Span>,
    pub segment_count: usize,
}

/// Per-modality decomposition of one execution
///
/// `enabled` is a keyword heuristic over node class types; the work units
/// are planned for every modality regardless.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamPlan {
    pub image: ImagePlan,
    pub video: VideoPlan,
    pub audio: AudioPlan,
    pub optimization: OptimizationSummary,
}

/// Builds stream plans with one engine per modality
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamPlanner {
    pub image: ImageEngine,
    pub video: VideoEngine,
    pub audio: AudioEngine,
}

impl StreamPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan every modality of `graph`; `optimization` is left empty
    ///
    /// Dimensions are not capped: the tile list grows with `width × height`
    /// as written in the graph. Callers planning untrusted graphs should
    /// bound dimensions first (for example with `optimize_prompt_graph`).
    pub fn build(&self, graph: &PromptGraph, tile_size: i64) -> StreamPlan {
        let (width, height) = infer_dimensions(graph);
        let frame_count = infer_video_frames(graph);
        let sample_count = infer_audio_samples(graph);

        let tiles = self.image.plan_tiles(width, height, tile_size);
        let windows = self.video.plan_windows(frame_count);
        let segments = self.audio.plan_segments(sample_count);

        StreamPlan {
            image: ImagePlan {
                enabled: contains_keyword_node(graph, &IMAGE_KEYWORDS),
                width,
                height,
                tile_size,
                tile_count: tiles.len(),
                tiles,
            },
            video: VideoPlan {
                enabled: contains_keyword_node(graph, &VIDEO_KEYWORDS),
                frame_count,
                window_count: windows.len(),
                windows,
            },
            audio: AudioPlan {
                enabled: contains_keyword_node(graph, &AUDIO_KEYWORDS),
                sample_count,
                segment_count: segments.len(),
                segments,
            },
            optimization: OptimizationSummary::default(),
        }
    }
}

/// First node with integer `width` and `height`, each raised to at least 64
pub fn infer_dimensions(graph: &PromptGraph) -> (i64, i64) {
    graph
        .values()
        .filter_map(node_inputs)
        .find_map(|inputs| {
            let width = int_input(inputs, "width")?;
            let height = int_input(inputs, "height")?;
            Some((width.max(MIN_IMAGE_EDGE), height.max(MIN_IMAGE_EDGE)))
        })
        .unwrap_or((DEFAULT_IMAGE_EDGE, DEFAULT_IMAGE_EDGE))
}

/// First positive integer under `frames`, `num_frames` or `frame_count`
pub fn infer_video_frames(graph: &PromptGraph) -> i64 {
    graph
        .values()
        .filter_map(node_inputs)
        .find_map(|inputs| {
            FRAME_KEYS
                .iter()
                .filter_map(|key| int_input(inputs, key))
                .find(|frames| *frames > 0)
        })
        .unwrap_or(DEFAULT_FRAME_COUNT)
}

/// First node with a positive `sample_count`, or with numeric `seconds` and
/// a positive integer `sample_rate` (product truncated)
pub fn infer_audio_samples(graph: &PromptGraph) -> i64 {
    graph
        .values()
        .filter_map(node_inputs)
        .find_map(|inputs| {
            if let Some(samples) = int_input(inputs, "sample_count").filter(|s| *s > 0) {
                return Some(samples);
            }
            let seconds = number_input(inputs, "seconds")?;
            let rate = int_input(inputs, "sample_rate").filter(|r| *r > 0)?;
            Some((seconds * rate as f64) as i64)
        })
        .unwrap_or(DEFAULT_SAMPLE_COUNT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn graph(value: Value) -> PromptGraph {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_dimension_defaults_and_floor() {
        assert_eq!(infer_dimensions(&graph(json!({}))), (1024, 1024));
        assert_eq!(
            infer_dimensions(&graph(json!({"1": {"inputs": {"width": 32, "height": 720}}}))),
            (64, 720)
        );
    }

    #[test]
    fn test_dimensions_need_both_integers() {
        let g = graph(json!({
            "1": {"inputs": {"width": 512.0, "height": 512}},
            "2": {"inputs": {"width": 800}},
            "3": {"inputs": {"width": 640, "height": 480}},
            "4": {"inputs": {"width": 2048, "height": 2048}}
        }));
        assert_eq!(infer_dimensions(&g), (640, 480));
    }

    #[test]
    fn test_frame_inference_skips_non_positive() {
        let g = graph(json!({
            "1": {"inputs": {"frames": 0, "num_frames": "12"}},
            "2": {"inputs": {"frame_count": 30}}
        }));
        assert_eq!(infer_video_frames(&g), 30);
        assert_eq!(infer_video_frames(&graph(json!({"1": {"inputs": {}}}))), 24);
    }

    #[test]
    fn test_sample_inference_sources() {
        let direct = graph(json!({"1": {"inputs": {"sample_count": 96000}}}));
        assert_eq!(infer_audio_samples(&direct), 96000);

        let derived = graph(json!({"1": {"inputs": {"seconds": 2.5, "sample_rate": 44100}}}));
        assert_eq!(infer_audio_samples(&derived), 110_250);

        let bad_rate = graph(json!({"1": {"inputs": {"seconds": 2, "sample_rate": 0}}}));
        assert_eq!(infer_audio_samples(&bad_rate), DEFAULT_SAMPLE_COUNT);
    }

    #[test]
    fn test_build_flags_and_counts() {
        let g = graph(json!({
            "1": {"class_type": "KSampler", "inputs": {"width": 512, "height": 512}},
            "2": {"class_type": "VideoCombine", "inputs": {"num_frames": 16}}
        }));
        let plan = StreamPlanner::new().build(&g, 512);

        assert!(plan.image.enabled);
        assert!(plan.video.enabled);
        assert!(!plan.audio.enabled);
        assert_eq!(plan.image.tile_count, plan.image.tiles.len());
        assert_eq!(plan.video.frame_count, 16);
        assert_eq!(plan.video.windows.first().map(|w| w.start), Some(0));
        assert_eq!(plan.video.windows.last().map(|w| w.end), Some(16));
        assert_eq!(plan.audio.sample_count, DEFAULT_SAMPLE_COUNT);
        assert!(plan.audio.segment_count > 0);
        assert_eq!(plan.optimization.changed_node_count, 0);
    }

    #[test]
    fn test_large_dimensions_are_not_capped() {
        let g = graph(json!({"1": {"inputs": {"width": 20000, "height": 20000}}}));
        let plan = StreamPlanner::new().build(&g, 1024);

        assert_eq!((plan.image.width, plan.image.height), (20000, 20000));
        // 21 columns × 21 rows at stride 992
        assert_eq!(plan.image.tile_count, 441);
        let last = plan.image.tiles.last().unwrap();
        assert_eq!((last.x + last.width, last.y + last.height), (20000, 20000));
    }

    #[test]
    fn test_plan_wire_shape() {
        let plan = StreamPlanner::new().build(&graph(json!({})), 1024);
        let value = serde_json::to_value(&plan).unwrap();
        assert_eq!(value["image"]["tile_count"], 4);
        assert_eq!(value["image"]["tiles"][0], json!({"x": 0, "y": 0, "width": 1024, "height": 1024}));
        assert!(value["video"]["windows"][0].get("start").is_some());
        assert!(value["audio"]["segment_count"].is_u64());
        assert_eq!(value["optimization"]["changed_node_count"], 0);
    }
}
