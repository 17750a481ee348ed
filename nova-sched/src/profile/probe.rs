//! Hardware probe seam and profile detection
//!
//! The real device query lives outside this crate; anything that can answer
//! the `HardwareProbe` questions can drive detection. `StaticProbe` answers
//! from fixed values (configuration or tests).

use super::ExecutionProfile;
use nova_common::config::HardwareConfig;
use thiserror::Error;
use tracing::{debug, warn};

/// Memory bucket upper bounds (inclusive), in MB
const PASCAL_2G_MAX_MB: u64 = 2500;
const PASCAL_4G_MAX_MB: u64 = 4500;
const PASCAL_6G_8G_MAX_MB: u64 = 9000;

/// Kind of the current compute device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Cpu,
    Accelerator,
}

/// Probe query failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// No device could be queried
    #[error("Device unavailable: {0}")]
    Unavailable(String),

    /// The device answered but the query failed
    #[error("Probe query failed: {0}")]
    Query(String),
}

/// Questions the profile detector asks about the current device
pub trait HardwareProbe: Send + Sync {
    fn device_kind(&self) -> Result<DeviceKind, ProbeError>;

    /// Driver-reported device name/vendor string
    fn vendor_string(&self) -> Result<String, ProbeError>;

    fn total_memory_mb(&self) -> Result<u64, ProbeError>;

    /// Device is an Intel XPU
    fn is_intel_xpu(&self) -> bool;

    /// Device is an accelerator kind (NPU, MLU, ...) that must use safe defaults
    fn is_safe_fallback_accelerator(&self) -> bool {
        false
    }
}

/// Probe answering from fixed values
///
/// A `None` field makes the corresponding query fail, which is how tests
/// exercise the degradation paths.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    pub device_kind: Option<DeviceKind>,
    pub vendor: Option<String>,
    pub total_memory_mb: Option<u64>,
    pub intel_xpu: bool,
    pub safe_fallback: bool,
}

impl StaticProbe {
    pub fn cpu() -> Self {
        Self {
            device_kind: Some(DeviceKind::Cpu),
            vendor: Some("cpu".to_string()),
            total_memory_mb: Some(0),
            ..Self::default()
        }
    }

    pub fn accelerator(vendor: &str, total_memory_mb: u64) -> Self {
        Self {
            device_kind: Some(DeviceKind::Accelerator),
            vendor: Some(vendor.to_string()),
            total_memory_mb: Some(total_memory_mb),
            ..Self::default()
        }
    }

    /// Every query fails
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn with_intel_xpu(mut self) -> Self {
        self.intel_xpu = true;
        self
    }

    pub fn with_safe_fallback(mut self) -> Self {
        self.safe_fallback = true;
        self
    }

    /// Build from the `[hardware]` config section
    ///
    /// Unknown device kinds are treated as CPU.
    pub fn from_config(config: &HardwareConfig) -> Self {
        let device_kind = match config.device_kind.to_ascii_lowercase().as_str() {
            "accelerator" => DeviceKind::Accelerator,
            "cpu" => DeviceKind::Cpu,
            other => {
                warn!("Unknown hardware.device_kind {:?}, treating as cpu", other);
                DeviceKind::Cpu
            }
        };
        Self {
            device_kind: Some(device_kind),
            vendor: Some(config.vendor.clone()),
            total_memory_mb: Some(config.total_memory_mb),
            intel_xpu: config.intel_xpu,
            safe_fallback: config.safe_fallback,
        }
    }
}

impl HardwareProbe for StaticProbe {
    fn device_kind(&self) -> Result<DeviceKind, ProbeError> {
        self.device_kind
            .ok_or_else(|| ProbeError::Unavailable("no device configured".to_string()))
    }

    fn vendor_string(&self) -> Result<String, ProbeError> {
        self.vendor
            .clone()
            .ok_or_else(|| ProbeError::Query("vendor string unavailable".to_string()))
    }

    fn total_memory_mb(&self) -> Result<u64, ProbeError> {
        self.total_memory_mb
            .ok_or_else(|| ProbeError::Query("memory size unavailable".to_string()))
    }

    fn is_intel_xpu(&self) -> bool {
        self.intel_xpu
    }

    fn is_safe_fallback_accelerator(&self) -> bool {
        self.safe_fallback
    }
}

/// Lower-cased vendor string, empty on failure
fn vendor_lower(probe: &dyn HardwareProbe) -> String {
    match probe.vendor_string() {
        Ok(name) => name.to_lowercase(),
        Err(e) => {
            debug!("Vendor lookup failed, using empty name: {}", e);
            String::new()
        }
    }
}

/// Classify the current device
///
/// Decision order:
/// 1. CPU device (or device query failure) → `cpu_safe`
/// 2. Intel XPU → `intel_xpu`
/// 3. Safe-fallback accelerator kinds → `cpu_safe`
/// 4. Vendor contains "amd"/"radeon" → `amd_rocm`
/// 5. Vendor contains "rtx" → `rtx_modern`
/// 6. Memory buckets: ≤2500 → `pascal_2g`, ≤4500 → `pascal_4g`,
///    ≤9000 → `pascal_6g_8g`, else `rtx_modern`
///
/// Never fails: probe errors degrade to conservative answers.
pub fn detect_profile(probe: &dyn HardwareProbe) -> ExecutionProfile {
    match probe.device_kind() {
        Ok(DeviceKind::Cpu) => return ExecutionProfile::CpuSafe,
        Ok(DeviceKind::Accelerator) => {}
        Err(e) => {
            warn!("Device probe failed, falling back to cpu_safe: {}", e);
            return ExecutionProfile::CpuSafe;
        }
    }

    if probe.is_intel_xpu() {
        return ExecutionProfile::IntelXpu;
    }
    if probe.is_safe_fallback_accelerator() {
        return ExecutionProfile::CpuSafe;
    }

    let vendor = vendor_lower(probe);
    if vendor.contains("amd") || vendor.contains("radeon") {
        return ExecutionProfile::AmdRocm;
    }
    if vendor.contains("rtx") {
        return ExecutionProfile::RtxModern;
    }

    let total_mb = probe.total_memory_mb().unwrap_or_else(|e| {
        debug!("Memory query failed, assuming 0 MB: {}", e);
        0
    });
    match total_mb {
        mb if mb <= PASCAL_2G_MAX_MB => ExecutionProfile::Pascal2g,
        mb if mb <= PASCAL_4G_MAX_MB => ExecutionProfile::Pascal4g,
        mb if mb <= PASCAL_6G_8G_MAX_MB => ExecutionProfile::Pascal6g8g,
        _ => ExecutionProfile::RtxModern,
    }
}
