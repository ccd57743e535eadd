// crates/coherence-engine-core/src/core/config.rs
// ============================================================================
// Module: Coherence Engine Configuration
// Description: Runtime-mutable engine parameters and validated partial merge.
// Purpose: Hold the thresholds and deadline consulted on every evaluation.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! The engine consults three live parameters on every evaluation: the
//! confidence threshold feeding verdict derivation, the escalation threshold
//! feeding the low-confidence rules, and the whole-pipeline deadline.
//! Updates arrive as partial merges and are validated before they take
//! effect; an invalid update leaves the previous configuration untouched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default aggregate-confidence threshold for an Allow verdict.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;
/// Default aggregate-confidence threshold below which evaluations escalate.
pub const DEFAULT_ESCALATION_THRESHOLD: f64 = 0.5;
/// Default whole-pipeline deadline in milliseconds.
pub const DEFAULT_EVALUATION_TIMEOUT_MS: u64 = 30_000;
/// Minimum accepted whole-pipeline deadline in milliseconds.
pub const MIN_EVALUATION_TIMEOUT_MS: u64 = 1;

// ============================================================================
// SECTION: Engine Configuration
// ============================================================================

/// Live engine configuration consulted by the pipeline and escalation rules.
///
/// # Invariants
/// - Thresholds are within `[0, 1]`.
/// - `evaluation_timeout_ms` is at least [`MIN_EVALUATION_TIMEOUT_MS`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Aggregate-confidence threshold for an Allow verdict.
    pub confidence_threshold: f64,
    /// Aggregate-confidence threshold below which evaluations escalate.
    pub escalation_threshold: f64,
    /// Whole-pipeline deadline in milliseconds.
    pub evaluation_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            escalation_threshold: DEFAULT_ESCALATION_THRESHOLD,
            evaluation_timeout_ms: DEFAULT_EVALUATION_TIMEOUT_MS,
        }
    }
}

impl EngineConfig {
    /// Validates the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first violated bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_threshold("confidence_threshold", self.confidence_threshold)?;
        validate_threshold("escalation_threshold", self.escalation_threshold)?;
        if self.evaluation_timeout_ms < MIN_EVALUATION_TIMEOUT_MS {
            return Err(ConfigError::TimeoutOutOfRange(self.evaluation_timeout_ms));
        }
        Ok(())
    }

    /// Applies a partial update, returning the merged configuration.
    ///
    /// The merge is validated as a whole; on error the previous
    /// configuration remains in force.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the merged configuration violates a
    /// bound.
    pub fn merged(&self, update: &ConfigUpdate) -> Result<Self, ConfigError> {
        let merged = Self {
            confidence_threshold: update
                .confidence_threshold
                .unwrap_or(self.confidence_threshold),
            escalation_threshold: update
                .escalation_threshold
                .unwrap_or(self.escalation_threshold),
            evaluation_timeout_ms: update
                .evaluation_timeout_ms
                .unwrap_or(self.evaluation_timeout_ms),
        };
        merged.validate()?;
        Ok(merged)
    }
}

/// Partial configuration update merged into the live configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    /// New confidence threshold, when present.
    pub confidence_threshold: Option<f64>,
    /// New escalation threshold, when present.
    pub escalation_threshold: Option<f64>,
    /// New whole-pipeline deadline, when present.
    pub evaluation_timeout_ms: Option<u64>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Engine configuration errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A threshold is outside `[0, 1]` or not finite.
    #[error("{field} must be a finite value in [0, 1], got {value}")]
    ThresholdOutOfRange {
        /// Field name.
        field: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// The evaluation timeout is below the accepted minimum.
    #[error("evaluation_timeout_ms must be at least {MIN_EVALUATION_TIMEOUT_MS}, got {0}")]
    TimeoutOutOfRange(u64),
}

/// Validates one threshold field.
fn validate_threshold(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ThresholdOutOfRange {
            field,
            value,
        })
    }
}
