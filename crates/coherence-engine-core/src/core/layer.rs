// crates/coherence-engine-core/src/core/layer.rs
// ============================================================================
// Module: Coherence Layer Records
// Description: Layer capability records, retry policy, and per-layer results.
// Purpose: Describe one pluggable judgment stage and its normalized outcome.
// Dependencies: serde, crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! A [`CoherenceLayer`] is a capability record: priority, failure policy,
//! and a handler behind one interface type. The registry owns these records;
//! the executor consumes them and produces one [`LayerResult`] per layer per
//! evaluation, degraded but well-formed even on failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::LayerId;
use crate::core::verdict::Verdict;
use crate::interfaces::LayerHandler;

// ============================================================================
// SECTION: Layer Capability Record
// ============================================================================

/// One pluggable judgment stage registered with the engine.
///
/// # Invariants
/// - Owned exclusively by the layer registry; priority ties break by
///   registration order.
#[derive(Clone)]
pub struct CoherenceLayer {
    /// Layer identifier, unique within the registry.
    pub layer_id: LayerId,
    /// Human-readable layer name carried into results.
    pub name: String,
    /// Execution priority; lower runs earlier.
    pub priority: i64,
    /// Judgment handler invoked by the executor.
    pub handler: Arc<dyn LayerHandler>,
    /// Optional per-invocation timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Optional retry policy applied to handler errors.
    pub retry: Option<RetryPolicy>,
    /// Whether terminal failure of this layer invalidates the evaluation.
    pub critical: bool,
}

impl CoherenceLayer {
    /// Creates a non-critical layer with no timeout or retry policy.
    #[must_use]
    pub fn new(
        layer_id: LayerId,
        name: impl Into<String>,
        priority: i64,
        handler: Arc<dyn LayerHandler>,
    ) -> Self {
        Self {
            layer_id,
            name: name.into(),
            priority,
            handler,
            timeout_ms: None,
            retry: None,
            critical: false,
        }
    }

    /// Sets the per-invocation timeout.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Marks the layer as critical.
    #[must_use]
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// Returns the serializable descriptor for this layer.
    #[must_use]
    pub fn descriptor(&self) -> LayerDescriptor {
        LayerDescriptor {
            layer_id: self.layer_id.clone(),
            name: self.name.clone(),
            priority: self.priority,
            timeout_ms: self.timeout_ms,
            retry: self.retry,
            critical: self.critical,
        }
    }
}

impl fmt::Debug for CoherenceLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoherenceLayer")
            .field("layer_id", &self.layer_id)
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("timeout_ms", &self.timeout_ms)
            .field("retry", &self.retry)
            .field("critical", &self.critical)
            .finish_non_exhaustive()
    }
}

/// Constant-backoff retry policy for handler errors.
///
/// # Invariants
/// - Backoff is constant between attempts; a success on any attempt
///   short-circuits the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// Constant delay between attempts in milliseconds.
    pub backoff_ms: u64,
}

/// Serializable view of a registered layer, without the handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    /// Layer identifier.
    pub layer_id: LayerId,
    /// Human-readable layer name.
    pub name: String,
    /// Execution priority.
    pub priority: i64,
    /// Optional per-invocation timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Optional retry policy.
    pub retry: Option<RetryPolicy>,
    /// Critical flag.
    pub critical: bool,
}

// ============================================================================
// SECTION: Layer Results
// ============================================================================

/// Normalized per-layer outcome attached to an evaluation.
///
/// # Invariants
/// - Produced once per layer per evaluation; never shared across
///   evaluations.
/// - `confidence` is clamped to `[0, 1]` on intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerResult {
    /// Layer identifier.
    pub layer_id: LayerId,
    /// Layer name at execution time.
    pub name: String,
    /// Verdict reached by the layer.
    pub verdict: Verdict,
    /// Clamped confidence in the verdict.
    pub confidence: f64,
    /// Measured handler duration in milliseconds, summed across attempts.
    pub duration_ms: u64,
    /// Failure detail for degraded results.
    pub failure: Option<LayerFailure>,
}

/// Failure detail carried by a degraded layer result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerFailure {
    /// Failure classification.
    pub kind: LayerFailureKind,
    /// Terminal error message.
    pub message: String,
}

/// Classification of a layer failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerFailureKind {
    /// The handler exceeded its invocation bound.
    Timeout,
    /// The handler returned an error on every attempt.
    Handler,
}
