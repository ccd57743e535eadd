// crates/coherence-engine-core/src/core/evaluation.rs
// ============================================================================
// Module: Coherence Evaluation Records
// Description: Immutable evaluation results, escalations, and batch outcomes.
// Purpose: Define the value produced by one pipeline run and cached verbatim.
// Dependencies: serde, crate::core
// ============================================================================

//! ## Overview
//! An [`Evaluation`] is the complete, immutable outcome of one pipeline run:
//! the aggregate verdict with its confidence and risk score, every per-layer
//! result, the accumulated evidence, and at most one escalation. Cache
//! entries are snapshots of this value; a new evaluation is a new value,
//! never a mutation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::evidence::Evidence;
use crate::core::fingerprint::Fingerprint;
use crate::core::identifiers::ContentId;
use crate::core::identifiers::EvaluationId;
use crate::core::identifiers::RuleId;
use crate::core::layer::LayerResult;
use crate::core::time::Timestamp;
use crate::core::verdict::Verdict;

// ============================================================================
// SECTION: Evaluation Record
// ============================================================================

/// Complete outcome of one coherence evaluation.
///
/// # Invariants
/// - Immutable once produced; repeat requests for the same `(cid, context)`
///   return this exact value from the cache, including `evaluation_id`.
/// - `confidence` and `risk_score` are clamped to `[0, 1]`.
/// - `layers` is non-empty: a run against zero registered layers fails fast
///   instead of producing an evaluation.
/// - `escalation` is set iff an escalation rule condition matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Deterministic evaluation identifier derived from the fingerprint.
    pub evaluation_id: EvaluationId,
    /// Content identifier under evaluation.
    pub cid: ContentId,
    /// Aggregate verdict.
    pub verdict: Verdict,
    /// Aggregate confidence in `[0, 1]`.
    pub confidence: f64,
    /// Aggregate risk score in `[0, 1]`.
    pub risk_score: f64,
    /// Per-layer results in execution order.
    pub layers: Vec<LayerResult>,
    /// Evidence accumulated across layers in execution order.
    pub evidence: Vec<Evidence>,
    /// Escalation raised for the evaluation, when any rule matched.
    pub escalation: Option<Escalation>,
    /// Evaluation metadata.
    pub metadata: EvaluationMetadata,
}

/// Metadata attached to an evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationMetadata {
    /// Caller-supplied request timestamp.
    pub evaluated_at: Timestamp,
    /// Measured wall-clock pipeline duration in milliseconds.
    pub evaluation_time_ms: u64,
    /// Fingerprint keying the cache entry for this evaluation.
    pub fingerprint: Fingerprint,
}

// ============================================================================
// SECTION: Escalation
// ============================================================================

/// Routing decision raised when automated evaluation is insufficient.
///
/// # Invariants
/// - At most one per evaluation; produced by the first matching rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escalation {
    /// Escalation action label, such as `expert-review`.
    pub action: String,
    /// Identifier of the rule that matched.
    pub rule_id: RuleId,
    /// Escalation priority.
    pub priority: EscalationPriority,
    /// Timestamp stamped from the evaluation request.
    pub created_at: Timestamp,
}

/// Priority band for an escalation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EscalationPriority {
    /// Routine follow-up.
    Low,
    /// Standard human review queue.
    Medium,
    /// Expedited expert review.
    High,
    /// Immediate intervention.
    Critical,
}

impl EscalationPriority {
    /// Returns the stable wire-form label for the priority.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

// ============================================================================
// SECTION: Warm-Up Outcomes
// ============================================================================

/// Per-cid outcome of a batch cache warm-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarmupOutcome {
    /// Content identifier the outcome belongs to.
    pub cid: ContentId,
    /// Evaluation result or failure detail.
    pub status: WarmupStatus,
}

/// Status of one warm-up entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WarmupStatus {
    /// The evaluation completed and was cached.
    Completed {
        /// The produced (or replayed) evaluation.
        evaluation: Box<Evaluation>,
    },
    /// The evaluation failed; the batch continued past it.
    Failed {
        /// Terminal error message.
        error: String,
    },
}
