// crates/coherence-engine-core/src/core/verdict.rs
// ============================================================================
// Module: Coherence Engine Verdicts
// Description: Four-valued judgment outcome shared by layers and evaluations.
// Purpose: Provide a stable, serializable verdict type with wire-form labels.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every coherence layer resolves to one of four verdicts, and the pipeline
//! aggregates per-layer verdicts into one final verdict of the same type.
//! Labels are stable wire forms consumed by events and downstream services.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Verdict
// ============================================================================

/// Judgment outcome produced by a layer or an aggregate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Content is coherent with the invocation context.
    Allow,
    /// Content must be rejected.
    Deny,
    /// Content is admissible with reservations.
    Warn,
    /// The layer or evaluation could not reach a judgment.
    Unknown,
}

impl Verdict {
    /// Returns the stable wire-form label for the verdict.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "ALLOW",
            Self::Deny => "DENY",
            Self::Warn => "WARN",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
