//! Per-request recommendations and prompt graph optimization
//!
//! Everything here is advisory: recommendations are returned to the caller
//! and graph optimization works on a copy, leaving the input untouched.

use super::{ExecutionProfile, HardwareProbe, ProfileHints};
use crate::graph::{int_input, node_inputs_mut, PromptGraph};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Above this many megapixels the recommended tile is halved
const LARGE_IMAGE_MEGAPIXELS: f64 = 2.5;
/// Floor for a halved tile
const MIN_RECOMMENDED_TILE: i64 = 384;

const DEFAULT_WIDTH: i64 = 1024;
const DEFAULT_HEIGHT: i64 = 1024;
const DEFAULT_STEPS: i64 = 20;

/// Advisory settings for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub tile_size: i64,
    pub micro_batch: i64,
    pub quantization: String,
    pub memory_headroom_mb: i64,
    pub max_steps: i64,
}

/// Result of `auto_optimize_hint`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoOptimizeHint {
    pub profile: ExecutionProfile,
    pub recommended: Recommendation,
}

/// Subset of clamped node parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClampedParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<i64>,
}

impl ClampedParams {
    pub fn is_empty(&self) -> bool {
        self.width.is_none() && self.height.is_none() && self.steps.is_none()
    }
}

/// Before/after values of the parameters that changed on one node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeChange {
    pub before: ClampedParams,
    pub after: ClampedParams,
}

/// What `optimize_prompt_graph` changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationSummary {
    pub changed_node_count: usize,
    pub changed_nodes: BTreeMap<String, NodeChange>,
}

/// Recommend tile size and step ceiling for a `width × height × steps` job
///
/// Images above 2.5 MP get half the profile tile (never below 384).
pub fn compute_recommendation(
    width: i64,
    height: i64,
    steps: i64,
    hints: &ProfileHints,
) -> Recommendation {
    let megapixels = (width as f64 * height as f64) / 1_000_000.0;
    let tile_size = if megapixels > LARGE_IMAGE_MEGAPIXELS {
        (hints.tile_size / 2).max(MIN_RECOMMENDED_TILE)
    } else {
        hints.tile_size
    };

    Recommendation {
        tile_size,
        micro_batch: hints.micro_batch,
        quantization: hints.quantization.clone(),
        memory_headroom_mb: hints.memory_headroom_mb,
        max_steps: steps.min(hints.profile.max_steps()),
    }
}

/// Read an integer-like payload field, falling back to `default`
///
/// Accepts integers, floats (truncated) and numeric strings.
fn payload_int(payload: &Map<String, Value>, key: &str, default: i64) -> i64 {
    let parsed = match payload.get(key) {
        None | Some(Value::Null) => return default,
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };
    parsed.unwrap_or_else(|| {
        debug!("Ignoring non-numeric {:?}, using default {}", key, default);
        default
    })
}

/// Frontend-facing hint: profile plus recommendation for the given payload
///
/// Payload fields (all optional): `profile` (override name; unknown names
/// fall back to detection), `width`, `height`, `steps` (defaults
/// 1024/1024/20). Side-effect free.
pub fn auto_optimize_hint(payload: &Map<String, Value>, probe: &dyn HardwareProbe) -> AutoOptimizeHint {
    let profile = match payload.get("profile") {
        Some(Value::String(name)) => match name.parse::<ExecutionProfile>() {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!("{}, detecting profile instead", e);
                None
            }
        },
        _ => None,
    };
    let hints = super::get_profile_hints(profile, probe);

    let width = payload_int(payload, "width", DEFAULT_WIDTH);
    let height = payload_int(payload, "height", DEFAULT_HEIGHT);
    let steps = payload_int(payload, "steps", DEFAULT_STEPS);

    AutoOptimizeHint {
        profile: hints.profile,
        recommended: compute_recommendation(width, height, steps, &hints),
    }
}

/// Clamp graph parameters to what the profile can handle
///
/// Works on a deep copy. For every node with an `inputs` object:
/// - integer `width`/`height` above `tile_size * 2` → `tile_size * 2`
/// - integer `steps` above the profile step ceiling → the ceiling
///
/// Only changed parameters are recorded. Applying the result again with the
/// same hints changes nothing.
pub fn optimize_prompt_graph(
    graph: &PromptGraph,
    hints: &ProfileHints,
) -> (PromptGraph, OptimizationSummary) {
    let mut optimized = graph.clone();
    let mut changed_nodes = BTreeMap::new();
    let max_dim = hints.tile_size * 2;
    let max_steps = hints.profile.max_steps();

    for (node_id, node) in optimized.iter_mut() {
        let Some(inputs) = node_inputs_mut(node) else {
            continue;
        };
        let mut change = NodeChange::default();

        if let Some(width) = int_input(inputs, "width").filter(|w| *w > max_dim) {
            inputs.insert("width".to_string(), Value::from(max_dim));
            change.before.width = Some(width);
            change.after.width = Some(max_dim);
        }
        if let Some(height) = int_input(inputs, "height").filter(|h| *h > max_dim) {
            inputs.insert("height".to_string(), Value::from(max_dim));
            change.before.height = Some(height);
            change.after.height = Some(max_dim);
        }
        if let Some(steps) = int_input(inputs, "steps").filter(|s| *s > max_steps) {
            inputs.insert("steps".to_string(), Value::from(max_steps));
            change.before.steps = Some(steps);
            change.after.steps = Some(max_steps);
        }

        if !change.before.is_empty() {
            debug!("Clamped node {}: {:?} -> {:?}", node_id, change.before, change.after);
            changed_nodes.insert(node_id.clone(), change);
        }
    }

    let summary = OptimizationSummary {
        changed_node_count: changed_nodes.len(),
        changed_nodes,
    };
    (optimized, summary)
}
