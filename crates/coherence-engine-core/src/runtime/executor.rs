// crates/coherence-engine-core/src/runtime/executor.rs
// ============================================================================
// Module: Coherence Layer Executor
// Description: Bounded single-layer execution with retry and failure policy.
// Purpose: Run one layer and return a normalized result even on failure.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The executor runs one layer handler per attempt on a named worker thread
//! joined through an `mpsc` channel, so both the per-layer timeout and the
//! whole-pipeline deadline bound the wait rather than the handler itself. A
//! timed-out handler keeps running to completion and its late result is
//! discarded. Handler errors retry under the layer's constant-backoff
//! policy; timeouts are terminal. Terminal failure degrades non-critical
//! layers into an `UNKNOWN` result with `layer-error` evidence and aborts
//! the evaluation for critical layers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::mpsc;
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use serde_json::Value;
use thiserror::Error;

use crate::core::evidence::Evidence;
use crate::core::identifiers::ContentId;
use crate::core::identifiers::LayerId;
use crate::core::layer::CoherenceLayer;
use crate::core::layer::LayerFailure;
use crate::core::layer::LayerFailureKind;
use crate::core::layer::LayerResult;
use crate::core::time::Timestamp;
use crate::core::verdict::Verdict;
use crate::interfaces::HandlerError;
use crate::interfaces::LayerJudgment;

// ============================================================================
// SECTION: Layer Outcome
// ============================================================================

/// Normalized outcome of running one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerOutcome {
    /// Per-layer result record.
    pub result: LayerResult,
    /// Evidence stamped from the handler, plus synthesized error evidence.
    pub evidence: Vec<Evidence>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors that abort the surrounding evaluation.
#[derive(Debug, Error, PartialEq)]
pub enum ExecutorError {
    /// A critical layer failed terminally.
    #[error("critical layer {layer_id} failed: {message}")]
    CriticalLayer {
        /// Failing layer identifier.
        layer_id: LayerId,
        /// Failure classification.
        kind: LayerFailureKind,
        /// Original terminal error message.
        message: String,
    },
    /// The whole-pipeline deadline expired during layer execution.
    #[error("evaluation deadline exceeded while running layer {layer_id}")]
    DeadlineExceeded {
        /// Layer in flight when the deadline expired.
        layer_id: LayerId,
    },
}

// ============================================================================
// SECTION: Attempt Outcome
// ============================================================================

/// Result of one bounded handler attempt.
enum Attempt {
    /// The handler produced a judgment in time.
    Success(LayerJudgment),
    /// The handler returned an error; eligible for retry.
    HandlerError(String),
    /// The wait bound expired before the handler finished.
    TimedOut,
}

// ============================================================================
// SECTION: Layer Executor
// ============================================================================

/// Runs single layers with timeout enforcement and retry-with-backoff.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayerExecutor;

impl LayerExecutor {
    /// Creates a new layer executor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Runs one layer against the content reference and context.
    ///
    /// `requested_at` stamps evidence records; `deadline` is the
    /// whole-pipeline bound shared by every layer of the evaluation.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::CriticalLayer`] when a critical layer fails
    /// terminally and [`ExecutorError::DeadlineExceeded`] when the
    /// evaluation deadline expires mid-layer. Non-critical terminal failures
    /// are folded into a degraded [`LayerOutcome`] instead.
    pub fn run(
        &self,
        layer: &CoherenceLayer,
        cid: &ContentId,
        context: &Value,
        requested_at: Timestamp,
        deadline: Instant,
    ) -> Result<LayerOutcome, ExecutorError> {
        let started = Instant::now();
        let max_attempts = layer.retry.map_or(1_u64, |retry| u64::from(retry.max_retries) + 1);
        let mut attempt = 0_u64;

        let terminal = loop {
            attempt += 1;
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ExecutorError::DeadlineExceeded {
                    layer_id: layer.layer_id.clone(),
                });
            }

            let layer_bound = layer.timeout_ms.map(Duration::from_millis);
            let (wait, layer_bounded) = match layer_bound {
                Some(bound) if bound <= remaining => (bound, true),
                _ => (remaining, false),
            };

            match run_attempt(layer, cid, context, wait) {
                Attempt::Success(judgment) => {
                    return Ok(success_outcome(layer, judgment, requested_at, started));
                }
                Attempt::HandlerError(message) => {
                    if attempt < max_attempts {
                        if let Some(retry) = layer.retry {
                            let backoff = Duration::from_millis(retry.backoff_ms);
                            let remaining = deadline.saturating_duration_since(Instant::now());
                            thread::sleep(backoff.min(remaining));
                        }
                        continue;
                    }
                    break LayerFailure {
                        kind: LayerFailureKind::Handler,
                        message,
                    };
                }
                Attempt::TimedOut => {
                    if layer_bounded {
                        break LayerFailure {
                            kind: LayerFailureKind::Timeout,
                            message: format!(
                                "layer timed out after {}ms",
                                wait.as_millis()
                            ),
                        };
                    }
                    return Err(ExecutorError::DeadlineExceeded {
                        layer_id: layer.layer_id.clone(),
                    });
                }
            }
        };

        if layer.critical {
            return Err(ExecutorError::CriticalLayer {
                layer_id: layer.layer_id.clone(),
                kind: terminal.kind,
                message: terminal.message,
            });
        }

        Ok(degraded_outcome(layer, terminal, requested_at, started))
    }
}

// ============================================================================
// SECTION: Attempt Execution
// ============================================================================

/// Runs one handler attempt on a worker thread, bounded by `wait`.
fn run_attempt(layer: &CoherenceLayer, cid: &ContentId, context: &Value, wait: Duration) -> Attempt {
    let handler = Arc::clone(&layer.handler);
    let cid = cid.clone();
    let context = context.clone();
    let (sender, receiver) = mpsc::channel::<Result<LayerJudgment, HandlerError>>();

    let spawned = thread::Builder::new()
        .name(format!("coherence-layer-{}", layer.layer_id))
        .spawn(move || {
            // The receiver may already be gone after a timeout; the late
            // result is discarded.
            let _ = sender.send(handler.judge(&cid, &context));
        });
    if let Err(err) = spawned {
        return Attempt::HandlerError(format!("failed to spawn layer worker: {err}"));
    }

    match receiver.recv_timeout(wait) {
        Ok(Ok(judgment)) => Attempt::Success(judgment),
        Ok(Err(err)) => Attempt::HandlerError(err.to_string()),
        Err(RecvTimeoutError::Timeout) => Attempt::TimedOut,
        Err(RecvTimeoutError::Disconnected) => {
            Attempt::HandlerError("layer handler terminated without a result".to_string())
        }
    }
}

// ============================================================================
// SECTION: Outcome Construction
// ============================================================================

/// Builds the outcome for a successful attempt.
fn success_outcome(
    layer: &CoherenceLayer,
    judgment: LayerJudgment,
    requested_at: Timestamp,
    started: Instant,
) -> LayerOutcome {
    let confidence =
        if judgment.confidence.is_finite() { judgment.confidence.clamp(0.0, 1.0) } else { 0.0 };
    let evidence = judgment
        .evidence
        .into_iter()
        .map(|fragment| fragment.stamp(&layer.layer_id, requested_at))
        .collect();
    LayerOutcome {
        result: LayerResult {
            layer_id: layer.layer_id.clone(),
            name: layer.name.clone(),
            verdict: judgment.verdict,
            confidence,
            duration_ms: elapsed_ms(started),
            failure: None,
        },
        evidence,
    }
}

/// Builds the degraded outcome for a non-critical terminal failure.
fn degraded_outcome(
    layer: &CoherenceLayer,
    failure: LayerFailure,
    requested_at: Timestamp,
    started: Instant,
) -> LayerOutcome {
    let evidence =
        vec![Evidence::layer_error(layer.layer_id.clone(), requested_at, &failure.message)];
    LayerOutcome {
        result: LayerResult {
            layer_id: layer.layer_id.clone(),
            name: layer.name.clone(),
            verdict: Verdict::Unknown,
            confidence: 0.0,
            duration_ms: elapsed_ms(started),
            failure: Some(failure),
        },
        evidence,
    }
}

/// Returns elapsed wall-clock milliseconds since `started`.
fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
