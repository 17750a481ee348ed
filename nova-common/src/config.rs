//! Bootstrap configuration loading
//!
//! Configuration file resolution follows this priority order:
//! 1. Explicit path (command-line `--config`)
//! 2. `NOVA_CONFIG` environment variable
//! 3. Platform config directory (`<config_dir>/nova/config.toml`)
//! 4. Built-in defaults (fallback)
//!
//! A missing file is never fatal: a warning is logged and defaults are used.
//! A file that exists but cannot be parsed is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "NOVA_CONFIG";

/// Environment variable forcing an execution profile
pub const PROFILE_ENV_VAR: &str = "NOVA_PROFILE";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NovaConfig {
    /// Force a profile instead of detecting one (unknown names are ignored)
    pub profile_override: Option<String>,

    /// Static hardware description used when no live probe is wired in
    pub hardware: HardwareConfig,

    /// Telemetry transport settings
    pub telemetry: TelemetryConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Static hardware description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    /// "cpu" or "accelerator"
    pub device_kind: String,
    /// Device vendor/name string as reported by the driver
    pub vendor: String,
    /// Total device memory in MB
    pub total_memory_mb: u64,
    /// Device is an Intel XPU
    pub intel_xpu: bool,
    /// Device is an accelerator kind that must fall back to safe defaults
    pub safe_fallback: bool,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            device_kind: "cpu".to_string(),
            vendor: String::new(),
            total_memory_mb: 0,
            intel_xpu: false,
            safe_fallback: false,
        }
    }
}

/// Telemetry transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Whether the local subscriber advertises NOVA telemetry support
    pub enabled: bool,
    /// Subscriber id of the local subscriber
    pub subscriber_id: String,
    /// Broadcast buffer size
    pub channel_capacity: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            subscriber_id: "cli".to_string(),
            channel_capacity: 256,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl NovaConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from an explicit file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Resolve and load configuration, then apply environment overrides
    ///
    /// # Errors
    /// Returns error only if a config file exists but cannot be read or parsed.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let mut config = match resolve_config_path(cli_path) {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) => {
                warn!("Config file {} not found, using defaults", path.display());
                Self::default()
            }
            None => {
                info!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `NOVA_PROFILE` if set and non-empty
    pub fn apply_env_overrides(&mut self) {
        if let Ok(profile) = std::env::var(PROFILE_ENV_VAR) {
            let profile = profile.trim();
            if !profile.is_empty() {
                info!("Profile override from {}: {}", PROFILE_ENV_VAR, profile);
                self.profile_override = Some(profile.to_string());
            }
        }
    }

    /// Validate values that serde cannot check
    pub fn validate(&self) -> Result<()> {
        match self.hardware.device_kind.to_ascii_lowercase().as_str() {
            "cpu" | "accelerator" => {}
            other => {
                return Err(Error::Config(format!(
                    "hardware.device_kind must be \"cpu\" or \"accelerator\", got {:?}",
                    other
                )))
            }
        }
        if self.telemetry.subscriber_id.trim().is_empty() {
            return Err(Error::Config("telemetry.subscriber_id must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Pick the config file path by priority; `None` when no candidate applies
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory (only if present)
    default_config_path().filter(|path| path.exists())
}

/// `<config_dir>/nova/config.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("nova").join("config.toml"))
}
