// crates/coherence-engine-core/src/interfaces/mod.rs
// ============================================================================
// Module: Coherence Engine Interfaces
// Description: Backend-agnostic interfaces for handlers, cache, and telemetry.
// Purpose: Define the contract surfaces used by the coherence runtime.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how the engine integrates with judgment handlers and
//! external systems without embedding backend-specific details. Handler and
//! cache implementations must be deterministic for identical inputs; event
//! and metrics collaborators are optional and best-effort.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;

use crate::core::evaluation::Evaluation;
use crate::core::events::EvaluationCompleted;
use crate::core::events::EvaluationMetricEvent;
use crate::core::evidence::EvidenceFragment;
use crate::core::fingerprint::Fingerprint;
use crate::core::identifiers::ContentId;
use crate::core::verdict::Verdict;

// ============================================================================
// SECTION: Layer Handler
// ============================================================================

/// Judgment returned by one layer handler invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerJudgment {
    /// Verdict reached by the handler.
    pub verdict: Verdict,
    /// Handler confidence; clamped to `[0, 1]` on intake.
    pub confidence: f64,
    /// Evidence fragments supporting the verdict.
    pub evidence: Vec<EvidenceFragment>,
}

/// Layer handler errors.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Handler reported an error.
    #[error("layer handler error: {0}")]
    Handler(String),
}

/// One pluggable judgment stage implementation.
///
/// Handlers run on executor-owned worker threads, so implementations must be
/// `Send + Sync`. A handler abandoned after a timeout keeps running to
/// completion; its result is discarded.
pub trait LayerHandler: Send + Sync {
    /// Judges the content reference in the supplied context.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when no judgment could be produced; the
    /// executor applies the layer retry policy before giving up.
    fn judge(&self, cid: &ContentId, context: &Value) -> Result<LayerJudgment, HandlerError>;
}

// ============================================================================
// SECTION: Evaluation Cache
// ============================================================================

/// Evaluation cache errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Cache storage reported an error.
    #[error("evaluation cache error: {0}")]
    Store(String),
    /// The cache refused an insert because its entry bound is reached.
    #[error("evaluation cache is full ({capacity} entries)")]
    Full {
        /// Configured entry bound.
        capacity: usize,
    },
}

/// Fingerprint-keyed evaluation cache.
///
/// Implementations must make writes atomic per key (last writer wins) and
/// must never mutate stored evaluations. Eviction is explicit: there is no
/// TTL, only [`EvaluationCache::reset`].
pub trait EvaluationCache {
    /// Returns the cached evaluation for a fingerprint, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the lookup fails.
    fn get(&self, fingerprint: &Fingerprint) -> Result<Option<Evaluation>, CacheError>;

    /// Inserts an evaluation snapshot under its fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the insert fails or the entry bound is
    /// reached.
    fn put(&self, fingerprint: Fingerprint, evaluation: Evaluation) -> Result<(), CacheError>;

    /// Removes every cached entry.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the reset fails.
    fn reset(&self) -> Result<(), CacheError>;

    /// Returns the number of cached entries.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the count cannot be read.
    fn len(&self) -> Result<usize, CacheError>;

    /// Returns true when the cache holds no entries.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the count cannot be read.
    fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }
}

// ============================================================================
// SECTION: Event Publisher
// ============================================================================

/// Event publishing errors.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The event bus reported an error.
    #[error("event publish error: {0}")]
    Publish(String),
}

/// Event-bus collaborator receiving evaluation-completed events.
///
/// Optional dependency: the pipeline publishes best-effort and ignores
/// failures.
pub trait EventPublisher: Send + Sync {
    /// Publishes an evaluation-completed event.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] when delivery fails; the pipeline treats
    /// this as fire-and-forget.
    fn publish(&self, event: &EvaluationCompleted) -> Result<(), PublishError>;
}

// ============================================================================
// SECTION: Metrics Sink
// ============================================================================

/// Observability collaborator receiving per-evaluation metric events.
///
/// Optional dependency: recording is infallible by contract so backends
/// absorb their own failures.
pub trait MetricsSink: Send + Sync {
    /// Records one evaluation metric event.
    fn record(&self, event: &EvaluationMetricEvent);
}
