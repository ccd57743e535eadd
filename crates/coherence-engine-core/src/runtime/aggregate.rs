// crates/coherence-engine-core/src/runtime/aggregate.rs
// ============================================================================
// Module: Coherence Aggregation
// Description: Aggregate confidence, risk score, and verdict derivation.
// Purpose: Fold per-layer results and risk evidence into one final decision.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The aggregation formula is monotonic and documented here because the
//! numbers are behaviorally observable:
//!
//! - Aggregate confidence is the weighted arithmetic mean of layer
//!   confidences; a layer that contributed risk-kind evidence weighs
//!   [`RISK_CONTRIBUTOR_WEIGHT`], every other layer weighs 1.0.
//! - Risk score is the maximum over every Deny layer's confidence, half of
//!   every Warn layer's confidence, and every clamped risk-evidence score.
//! - The verdict is Deny when the strongest Deny outranks the strongest
//!   Allow, Warn when a Deny or Warn remains below that bar, Allow when an
//!   Allow exists and aggregate confidence meets the configured threshold,
//!   and Unknown otherwise.
//!
//! Both aggregate values are clamped to `[0, 1]` even when inputs are out
//! of range.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::config::EngineConfig;
use crate::core::evidence::Evidence;
use crate::core::layer::LayerResult;
use crate::core::verdict::Verdict;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Confidence weight for layers that contributed risk-kind evidence.
pub const RISK_CONTRIBUTOR_WEIGHT: f64 = 2.0;
/// Risk contribution factor applied to Warn-layer confidences.
const WARN_RISK_FACTOR: f64 = 0.5;

// ============================================================================
// SECTION: Aggregate Outcome
// ============================================================================

/// Aggregated decision values for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateOutcome {
    /// Final verdict.
    pub verdict: Verdict,
    /// Aggregate confidence in `[0, 1]`.
    pub confidence: f64,
    /// Aggregate risk score in `[0, 1]`.
    pub risk_score: f64,
}

// ============================================================================
// SECTION: Aggregation
// ============================================================================

/// Aggregates layer results and evidence into the final decision values.
///
/// The pipeline guarantees `layers` is non-empty; an empty slice aggregates
/// to an Unknown verdict with zero confidence.
#[must_use]
pub fn aggregate(
    layers: &[LayerResult],
    evidence: &[Evidence],
    config: &EngineConfig,
) -> AggregateOutcome {
    let confidence = aggregate_confidence(layers, evidence);
    let risk_score = aggregate_risk(layers, evidence);
    let verdict = derive_verdict(layers, confidence, config);
    AggregateOutcome {
        verdict,
        confidence,
        risk_score,
    }
}

/// Computes the weighted mean of layer confidences.
fn aggregate_confidence(layers: &[LayerResult], evidence: &[Evidence]) -> f64 {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for layer in layers {
        let weight = if has_risk_evidence(evidence, layer) {
            RISK_CONTRIBUTOR_WEIGHT
        } else {
            1.0
        };
        weighted_sum += weight * layer.confidence.clamp(0.0, 1.0);
        weight_total += weight;
    }
    if weight_total > 0.0 { (weighted_sum / weight_total).clamp(0.0, 1.0) } else { 0.0 }
}

/// Computes the maximum risk component across layers and risk evidence.
fn aggregate_risk(layers: &[LayerResult], evidence: &[Evidence]) -> f64 {
    let mut risk: f64 = 0.0;
    for layer in layers {
        match layer.verdict {
            Verdict::Deny => risk = risk.max(layer.confidence.clamp(0.0, 1.0)),
            Verdict::Warn => {
                risk = risk.max(layer.confidence.clamp(0.0, 1.0) * WARN_RISK_FACTOR);
            }
            Verdict::Allow | Verdict::Unknown => {}
        }
    }
    for record in evidence {
        if let Some(score) = record.risk_score() {
            risk = risk.max(score);
        }
    }
    risk.clamp(0.0, 1.0)
}

/// Derives the final verdict from layer verdicts and aggregate confidence.
fn derive_verdict(layers: &[LayerResult], confidence: f64, config: &EngineConfig) -> Verdict {
    let best_allow = best_confidence(layers, Verdict::Allow);
    let best_deny = best_confidence(layers, Verdict::Deny);
    let any_warn = layers.iter().any(|layer| layer.verdict == Verdict::Warn);

    if let Some(deny) = best_deny {
        if deny >= best_allow.unwrap_or(0.0) {
            return Verdict::Deny;
        }
        return Verdict::Warn;
    }
    if any_warn {
        return Verdict::Warn;
    }
    if best_allow.is_some() && confidence >= config.confidence_threshold {
        return Verdict::Allow;
    }
    Verdict::Unknown
}

/// Returns the strongest clamped confidence among layers with the verdict.
pub(crate) fn best_confidence(layers: &[LayerResult], verdict: Verdict) -> Option<f64> {
    layers
        .iter()
        .filter(|layer| layer.verdict == verdict)
        .map(|layer| layer.confidence.clamp(0.0, 1.0))
        .fold(None, |best, value| Some(best.map_or(value, |current: f64| current.max(value))))
}

/// Returns true when the evidence list holds a risk-kind record from the layer.
fn has_risk_evidence(evidence: &[Evidence], layer: &LayerResult) -> bool {
    evidence.iter().any(|record| {
        record.is_risk_kind() && record.source_layer.as_ref() == Some(&layer.layer_id)
    })
}
