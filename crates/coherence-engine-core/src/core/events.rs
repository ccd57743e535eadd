// crates/coherence-engine-core/src/core/events.rs
// ============================================================================
// Module: Coherence Engine Events
// Description: Domain events and metric events emitted per evaluation.
// Purpose: Provide observability payloads without hard telemetry deps.
// Dependencies: serde, crate::core
// ============================================================================

//! ## Overview
//! The pipeline emits one [`EvaluationCompleted`] domain event and one
//! [`EvaluationMetricEvent`] per evaluation through injected collaborators.
//! Both payloads are intentionally dependency-light so deployments can plug
//! in their own bus and metrics backend without redesign. Emission is
//! best-effort: collaborator absence or failure never blocks evaluation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::evaluation::Evaluation;
use crate::core::identifiers::ContentId;
use crate::core::identifiers::CorrelationId;
use crate::core::identifiers::EvaluationId;
use crate::core::time::Timestamp;
use crate::core::verdict::Verdict;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Topic for evaluation-completed domain events.
pub const EVALUATION_COMPLETED_TOPIC: &str = "q.coherence.evaluation.completed.v1";

// ============================================================================
// SECTION: Domain Events
// ============================================================================

/// Domain event published after an evaluation completes.
///
/// # Invariants
/// - Carries a summary, never the full evidence list; consumers needing
///   detail replay the evaluation by cid and context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationCompleted {
    /// Evaluation identifier.
    pub evaluation_id: EvaluationId,
    /// Content identifier.
    pub cid: ContentId,
    /// Aggregate verdict.
    pub verdict: Verdict,
    /// Aggregate confidence.
    pub confidence: f64,
    /// Aggregate risk score.
    pub risk_score: f64,
    /// Whether an escalation was raised.
    pub escalated: bool,
    /// Caller-supplied request timestamp.
    pub completed_at: Timestamp,
    /// Optional caller correlation identifier.
    pub correlation_id: Option<CorrelationId>,
}

impl EvaluationCompleted {
    /// Builds the event from a completed evaluation.
    #[must_use]
    pub fn from_evaluation(
        evaluation: &Evaluation,
        correlation_id: Option<CorrelationId>,
    ) -> Self {
        Self {
            evaluation_id: evaluation.evaluation_id.clone(),
            cid: evaluation.cid.clone(),
            verdict: evaluation.verdict,
            confidence: evaluation.confidence,
            risk_score: evaluation.risk_score,
            escalated: evaluation.escalation.is_some(),
            completed_at: evaluation.metadata.evaluated_at,
            correlation_id,
        }
    }

    /// Returns the topic the event is published on.
    #[must_use]
    pub const fn topic() -> &'static str {
        EVALUATION_COMPLETED_TOPIC
    }
}

// ============================================================================
// SECTION: Metric Labels
// ============================================================================

/// Evaluation outcome classification for metrics.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EvaluationOutcome {
    /// Evaluation completed.
    Ok,
    /// Evaluation failed.
    Error,
}

impl EvaluationOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// Evaluation metric event payload.
///
/// # Invariants
/// - Optional fields are `None` when the evaluation failed before the
///   corresponding value existed.
#[derive(Debug, Clone)]
pub struct EvaluationMetricEvent {
    /// Evaluation outcome.
    pub outcome: EvaluationOutcome,
    /// Aggregate verdict label when the evaluation completed.
    pub verdict: Option<Verdict>,
    /// Whether the result was served from the cache.
    pub cache_hit: bool,
    /// Number of layers executed.
    pub layer_count: usize,
    /// Whether an escalation was raised.
    pub escalated: bool,
    /// Measured pipeline duration in milliseconds.
    pub duration_ms: u64,
}
