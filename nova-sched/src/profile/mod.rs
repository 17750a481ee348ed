//! Execution profile selection and tuning hints
//!
//! **Purpose:** Map the current device onto a coarse capability profile and
//! give every profile a fixed set of tuning defaults.
//!
//! - `probe`: hardware probe seam and profile detection
//! - `policy`: per-request recommendations and prompt graph clamping

pub mod policy;
pub mod probe;

pub use policy::{
    auto_optimize_hint, compute_recommendation, optimize_prompt_graph, AutoOptimizeHint,
    NodeChange, OptimizationSummary, Recommendation,
};
pub use probe::{detect_profile, DeviceKind, HardwareProbe, ProbeError, StaticProbe};

use nova_common::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Step cap applied to Pascal-class profiles
pub const PASCAL_MAX_STEPS: i64 = 28;
/// Step cap applied to every other profile
pub const DEFAULT_MAX_STEPS: i64 = 40;

/// Coarse device capability tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionProfile {
    #[serde(rename = "pascal_2g")]
    Pascal2g,
    #[serde(rename = "pascal_4g")]
    Pascal4g,
    #[serde(rename = "pascal_6g_8g")]
    Pascal6g8g,
    #[serde(rename = "rtx_modern")]
    RtxModern,
    #[serde(rename = "amd_rocm")]
    AmdRocm,
    #[serde(rename = "intel_xpu")]
    IntelXpu,
    #[serde(rename = "cpu_safe")]
    CpuSafe,
}

impl ExecutionProfile {
    pub const ALL: [ExecutionProfile; 7] = [
        ExecutionProfile::Pascal2g,
        ExecutionProfile::Pascal4g,
        ExecutionProfile::Pascal6g8g,
        ExecutionProfile::RtxModern,
        ExecutionProfile::AmdRocm,
        ExecutionProfile::IntelXpu,
        ExecutionProfile::CpuSafe,
    ];

    /// Wire name of the profile
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionProfile::Pascal2g => "pascal_2g",
            ExecutionProfile::Pascal4g => "pascal_4g",
            ExecutionProfile::Pascal6g8g => "pascal_6g_8g",
            ExecutionProfile::RtxModern => "rtx_modern",
            ExecutionProfile::AmdRocm => "amd_rocm",
            ExecutionProfile::IntelXpu => "intel_xpu",
            ExecutionProfile::CpuSafe => "cpu_safe",
        }
    }

    pub fn is_pascal(&self) -> bool {
        self.as_str().contains("pascal")
    }

    /// Sampler step ceiling for this profile
    pub fn max_steps(&self) -> i64 {
        if self.is_pascal() {
            PASCAL_MAX_STEPS
        } else {
            DEFAULT_MAX_STEPS
        }
    }

    /// Tuning defaults for this profile
    ///
    /// Exhaustive: adding a profile without a row here fails to compile.
    pub fn hints(self) -> ProfileHints {
        let (tile_size, micro_batch, quantization, memory_headroom_mb) = match self {
            ExecutionProfile::Pascal2g => (512, 1, "int8", 512),
            ExecutionProfile::Pascal4g => (768, 1, "int8", 768),
            ExecutionProfile::Pascal6g8g => (1024, 1, "int4_or_int8", 1024),
            ExecutionProfile::RtxModern => (1280, 2, "fp16", 1536),
            ExecutionProfile::AmdRocm => (1024, 1, "fp16", 1024),
            ExecutionProfile::IntelXpu => (896, 1, "fp16", 1024),
            ExecutionProfile::CpuSafe => (512, 1, "fp32", 0),
        };
        ProfileHints {
            profile: self,
            tile_size,
            micro_batch,
            quantization: quantization.to_string(),
            memory_headroom_mb,
        }
    }
}

impl fmt::Display for ExecutionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExecutionProfile::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::UnknownProfile(s.to_string()))
    }
}

/// Tuning defaults associated with a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileHints {
    pub profile: ExecutionProfile,
    /// Preferred tile edge in pixels (> 0)
    pub tile_size: i64,
    /// Items per micro-batch (> 0)
    pub micro_batch: i64,
    /// Preferred weight quantization
    pub quantization: String,
    /// Device memory to keep free, in MB
    pub memory_headroom_mb: i64,
}

/// Hints for `profile`, detecting one through `probe` when none is given
pub fn get_profile_hints(
    profile: Option<ExecutionProfile>,
    probe: &dyn HardwareProbe,
) -> ProfileHints {
    profile.unwrap_or_else(|| detect_profile(probe)).hints()
}
