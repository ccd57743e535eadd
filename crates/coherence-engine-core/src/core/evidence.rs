// crates/coherence-engine-core/src/core/evidence.rs
// ============================================================================
// Module: Coherence Engine Evidence
// Description: Typed, timestamped facts supporting layer verdicts.
// Purpose: Provide append-only evidence records scoped to one evaluation.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Evidence flows from layer handlers into the evaluation record and weighs
//! into risk aggregation. Handlers emit bare [`EvidenceFragment`]s; the
//! executor stamps each fragment with the originating layer and the request
//! timestamp to produce an [`Evidence`] record. A small set of kinds is
//! reserved: `layer-error` for degraded layer results and the risk kinds
//! consumed by the aggregator.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::core::identifiers::LayerId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Reserved Kinds
// ============================================================================

/// Evidence kind recorded when a layer fails or times out.
pub const EVIDENCE_KIND_LAYER_ERROR: &str = "layer-error";

/// Evidence kinds whose `score` field weighs into risk aggregation.
pub const RISK_EVIDENCE_KINDS: &[&str] = &["risk-indicator", "content-risk", "risk-assessment"];

// ============================================================================
// SECTION: Evidence Records
// ============================================================================

/// Typed, timestamped fact supporting a verdict.
///
/// # Invariants
/// - Append-only: records are never mutated after being attached to an
///   evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Evidence kind label.
    pub kind: String,
    /// Timestamp stamped from the evaluation request.
    pub recorded_at: Timestamp,
    /// Layer that produced the evidence, when layer-scoped.
    pub source_layer: Option<LayerId>,
    /// Kind-specific payload.
    pub body: Value,
}

impl Evidence {
    /// Returns true when this record carries a risk kind.
    #[must_use]
    pub fn is_risk_kind(&self) -> bool {
        RISK_EVIDENCE_KINDS.contains(&self.kind.as_str())
    }

    /// Returns the clamped risk score for risk-kind records.
    ///
    /// Non-risk kinds and non-numeric `score` fields yield `None`. Scores
    /// outside `[0, 1]` are clamped rather than rejected.
    #[must_use]
    pub fn risk_score(&self) -> Option<f64> {
        if !self.is_risk_kind() {
            return None;
        }
        let score = self.body.get("score").and_then(Value::as_f64)?;
        if score.is_finite() { Some(score.clamp(0.0, 1.0)) } else { None }
    }

    /// Builds a `layer-error` record for a degraded layer result.
    #[must_use]
    pub fn layer_error(layer_id: LayerId, recorded_at: Timestamp, reason: &str) -> Self {
        Self {
            kind: EVIDENCE_KIND_LAYER_ERROR.to_string(),
            recorded_at,
            source_layer: Some(layer_id),
            body: json!({ "reason": reason }),
        }
    }
}

// ============================================================================
// SECTION: Evidence Fragments
// ============================================================================

/// Evidence emitted by a layer handler before stamping.
///
/// Handlers know the kind and payload; the executor supplies the layer
/// identity and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceFragment {
    /// Evidence kind label.
    pub kind: String,
    /// Kind-specific payload.
    pub body: Value,
}

impl EvidenceFragment {
    /// Creates a fragment with an arbitrary kind and payload.
    #[must_use]
    pub fn new(kind: impl Into<String>, body: Value) -> Self {
        Self {
            kind: kind.into(),
            body,
        }
    }

    /// Creates a `risk-indicator` fragment with the given score.
    #[must_use]
    pub fn risk_indicator(score: f64) -> Self {
        Self::new("risk-indicator", json!({ "score": score }))
    }

    /// Stamps the fragment into a full evidence record.
    #[must_use]
    pub fn stamp(self, layer_id: &LayerId, recorded_at: Timestamp) -> Evidence {
        Evidence {
            kind: self.kind,
            recorded_at,
            source_layer: Some(layer_id.clone()),
            body: self.body,
        }
    }
}
