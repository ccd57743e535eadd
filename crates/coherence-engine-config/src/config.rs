// crates/coherence-engine-config/src/config.rs
// ============================================================================
// Module: Coherence Engine Configuration
// Description: Configuration loading and validation for the coherence engine.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: coherence-engine-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path
//! limits. Sections are defaulted when absent and every value is range
//! checked; invalid configuration fails closed before an engine is built.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use coherence_engine_core::EngineConfig;
use coherence_engine_core::LayerDescriptor;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "coherence-engine.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "COHERENCE_ENGINE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum accepted whole-pipeline deadline in milliseconds.
pub const MAX_EVALUATION_TIMEOUT_MS: u64 = 600_000;
/// Maximum accepted per-layer timeout in milliseconds.
pub const MAX_LAYER_TIMEOUT_MS: u64 = 120_000;
/// Maximum accepted retry count for one layer.
pub const MAX_LAYER_RETRIES: u32 = 16;
/// Maximum accepted cache entry bound.
pub const MAX_CACHE_ENTRIES: usize = 16_777_216;

// ============================================================================
// SECTION: Configuration Model
// ============================================================================

/// Deployment configuration for the coherence engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoherenceEngineConfig {
    /// Engine thresholds and deadline.
    #[serde(default)]
    pub engine: EngineSection,
    /// Result cache limits.
    #[serde(default)]
    pub cache: CacheSection,
    /// Layer registration ceilings.
    #[serde(default)]
    pub layers: LayerLimitsSection,
}

impl CoherenceEngineConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit path, then [`CONFIG_ENV_VAR`], then
    /// `coherence-engine.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.cache.validate()?;
        self.layers.validate()?;
        Ok(())
    }

    /// Returns the live engine configuration for this deployment.
    #[must_use]
    pub const fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            confidence_threshold: self.engine.confidence_threshold,
            escalation_threshold: self.engine.escalation_threshold,
            evaluation_timeout_ms: self.engine.evaluation_timeout_ms,
        }
    }

    /// Returns the configured cache entry bound, if any.
    #[must_use]
    pub const fn cache_max_entries(&self) -> Option<usize> {
        self.cache.max_entries
    }

    /// Validates a layer descriptor against the configured ceilings.
    ///
    /// Deployments call this before registering externally supplied layers
    /// so a misconfigured layer fails closed instead of stalling the
    /// pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the violated ceiling.
    pub fn validate_layer(&self, descriptor: &LayerDescriptor) -> Result<(), ConfigError> {
        if let Some(timeout_ms) = descriptor.timeout_ms
            && timeout_ms > self.layers.max_timeout_ms
        {
            return Err(ConfigError::Invalid(format!(
                "layer {} timeout {}ms exceeds ceiling {}ms",
                descriptor.layer_id, timeout_ms, self.layers.max_timeout_ms
            )));
        }
        if let Some(retry) = descriptor.retry
            && retry.max_retries > self.layers.max_retries
        {
            return Err(ConfigError::Invalid(format!(
                "layer {} retry count {} exceeds ceiling {}",
                descriptor.layer_id, retry.max_retries, self.layers.max_retries
            )));
        }
        Ok(())
    }
}

/// Engine thresholds and deadline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineSection {
    /// Aggregate-confidence threshold for an Allow verdict.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Aggregate-confidence threshold below which evaluations escalate.
    #[serde(default = "default_escalation_threshold")]
    pub escalation_threshold: f64,
    /// Whole-pipeline deadline in milliseconds.
    #[serde(default = "default_evaluation_timeout_ms")]
    pub evaluation_timeout_ms: u64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            escalation_threshold: default_escalation_threshold(),
            evaluation_timeout_ms: default_evaluation_timeout_ms(),
        }
    }
}

impl EngineSection {
    /// Validates engine thresholds and deadline.
    fn validate(&self) -> Result<(), ConfigError> {
        let engine_config = EngineConfig {
            confidence_threshold: self.confidence_threshold,
            escalation_threshold: self.escalation_threshold,
            evaluation_timeout_ms: self.evaluation_timeout_ms,
        };
        engine_config.validate().map_err(|err| ConfigError::Invalid(err.to_string()))?;
        if self.evaluation_timeout_ms > MAX_EVALUATION_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "engine.evaluation_timeout_ms exceeds maximum {MAX_EVALUATION_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}

/// Result cache limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSection {
    /// Optional hard bound on cached entries; absent means unbounded.
    ///
    /// There is no TTL: eviction is explicit reset only, so bounded
    /// deployments must size this for their repeat-lookup working set.
    #[serde(default)]
    pub max_entries: Option<usize>,
}

impl CacheSection {
    /// Validates cache limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(max_entries) = self.max_entries {
            if max_entries == 0 {
                return Err(ConfigError::Invalid(
                    "cache.max_entries must be greater than zero".to_string(),
                ));
            }
            if max_entries > MAX_CACHE_ENTRIES {
                return Err(ConfigError::Invalid(format!(
                    "cache.max_entries exceeds maximum {MAX_CACHE_ENTRIES}"
                )));
            }
        }
        Ok(())
    }
}

/// Layer registration ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerLimitsSection {
    /// Maximum accepted per-layer timeout in milliseconds.
    #[serde(default = "default_max_layer_timeout_ms")]
    pub max_timeout_ms: u64,
    /// Maximum accepted retry count for one layer.
    #[serde(default = "default_max_layer_retries")]
    pub max_retries: u32,
}

impl Default for LayerLimitsSection {
    fn default() -> Self {
        Self {
            max_timeout_ms: default_max_layer_timeout_ms(),
            max_retries: default_max_layer_retries(),
        }
    }
}

impl LayerLimitsSection {
    /// Validates layer ceilings against the hard limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_timeout_ms == 0 || self.max_timeout_ms > MAX_LAYER_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "layers.max_timeout_ms must be in 1..={MAX_LAYER_TIMEOUT_MS}"
            )));
        }
        if self.max_retries > MAX_LAYER_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "layers.max_retries exceeds maximum {MAX_LAYER_RETRIES}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default aggregate-confidence threshold.
const fn default_confidence_threshold() -> f64 {
    coherence_engine_core::DEFAULT_CONFIDENCE_THRESHOLD
}

/// Default escalation threshold.
const fn default_escalation_threshold() -> f64 {
    coherence_engine_core::DEFAULT_ESCALATION_THRESHOLD
}

/// Default whole-pipeline deadline in milliseconds.
const fn default_evaluation_timeout_ms() -> u64 {
    coherence_engine_core::DEFAULT_EVALUATION_TIMEOUT_MS
}

/// Default per-layer timeout ceiling in milliseconds.
const fn default_max_layer_timeout_ms() -> u64 {
    30_000
}

/// Default per-layer retry ceiling.
const fn default_max_layer_retries() -> u32 {
    5
}

// ============================================================================
// SECTION: Path Resolution
// ============================================================================

/// Resolves the configuration path from explicit, env, or default sources.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates configuration path shape limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}
