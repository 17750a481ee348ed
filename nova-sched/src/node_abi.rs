//! Node execution descriptors
//!
//! Nodes that know how they can be scheduled describe themselves through
//! `NodeAbi`. Nodes that predate the descriptor are wrapped in
//! `LegacyNodeAdapter`, which reports nothing the scheduler could exploit.

use serde::{Deserialize, Serialize};

/// Scheduling capabilities a node advertises
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeExecutionDescriptor {
    pub supports_streaming: bool,
    pub supports_tiling: bool,
    /// Weight quantization the node accepts, e.g. `"int8"`; `"none"` if it
    /// needs full precision
    pub quantization_support: String,
}

impl Default for NodeExecutionDescriptor {
    fn default() -> Self {
        Self {
            supports_streaming: false,
            supports_tiling: false,
            quantization_support: "none".to_string(),
        }
    }
}

/// Implemented by node types that describe their own execution
pub trait NodeAbi {
    fn execution_descriptor() -> NodeExecutionDescriptor
    where
        Self: Sized;
}

/// Conservative descriptor source for nodes without `NodeAbi`
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyNodeAdapter;

impl LegacyNodeAdapter {
    /// Same answer for every legacy node class: no streaming, no tiling,
    /// quantization unknown
    pub fn execution_descriptor(_class_type: &str) -> NodeExecutionDescriptor {
        NodeExecutionDescriptor {
            supports_streaming: false,
            supports_tiling: false,
            quantization_support: "unknown".to_string(),
        }
    }
}
