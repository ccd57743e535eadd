// crates/coherence-engine-core/src/runtime/pipeline.rs
// ============================================================================
// Module: Coherence Evaluation Pipeline
// Description: Orchestrates layer execution, aggregation, and escalation.
// Purpose: Execute cache-first coherence evaluations with failure policy.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The pipeline is the single canonical execution path for the engine. All
//! API surfaces must call into these methods to preserve the determinism
//! and ordering contracts: cache-first lookup, sequential execution in
//! `(priority, registration order)` order, aggregation, escalation, cache
//! insert, then best-effort event and metric emission. A critical layer
//! failure or deadline expiry aborts before aggregation and caches nothing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::config::ConfigError;
use crate::core::config::ConfigUpdate;
use crate::core::config::EngineConfig;
use crate::core::evaluation::Evaluation;
use crate::core::evaluation::EvaluationMetadata;
use crate::core::evaluation::WarmupOutcome;
use crate::core::evaluation::WarmupStatus;
use crate::core::events::EvaluationCompleted;
use crate::core::events::EvaluationMetricEvent;
use crate::core::events::EvaluationOutcome;
use crate::core::evidence::Evidence;
use crate::core::fingerprint::Fingerprint;
use crate::core::fingerprint::FingerprintError;
use crate::core::fingerprint::fingerprint;
use crate::core::identifiers::ContentId;
use crate::core::identifiers::CorrelationId;
use crate::core::identifiers::LayerId;
use crate::core::layer::CoherenceLayer;
use crate::core::layer::LayerDescriptor;
use crate::core::layer::LayerFailureKind;
use crate::core::layer::LayerResult;
use crate::core::time::Timestamp;
use crate::interfaces::CacheError;
use crate::interfaces::EvaluationCache;
use crate::interfaces::EventPublisher;
use crate::interfaces::MetricsSink;
use crate::runtime::aggregate::aggregate;
use crate::runtime::escalation::EscalationEngine;
use crate::runtime::escalation::EscalationError;
use crate::runtime::escalation::EscalationRule;
use crate::runtime::escalation::EscalationRuleDescriptor;
use crate::runtime::executor::ExecutorError;
use crate::runtime::executor::LayerExecutor;
use crate::runtime::registry::LayerRegistry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Backstop deadline applied when the configured timeout overflows `Instant`.
const DEADLINE_BACKSTOP: Duration = Duration::from_secs(31_536_000);

// ============================================================================
// SECTION: Evaluation Request
// ============================================================================

/// Request for one coherence evaluation.
///
/// # Invariants
/// - `requested_at` stamps record content but never keys the cache, so
///   repeat requests with fresh timestamps still replay the cached value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    /// Content identifier under evaluation.
    pub cid: ContentId,
    /// Caller-supplied context value.
    pub context: Value,
    /// Caller-supplied request timestamp.
    pub requested_at: Timestamp,
    /// Optional caller correlation identifier.
    pub correlation_id: Option<CorrelationId>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Pipeline execution errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No layers are registered; an evaluation would be meaningless.
    #[error("no coherence layers are registered")]
    NoLayersRegistered,
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
    /// The whole-pipeline deadline expired.
    #[error("evaluation deadline exceeded while running layer {layer_id}")]
    DeadlineExceeded {
        /// Layer in flight when the deadline expired.
        layer_id: LayerId,
    },
    /// No recorded evaluation exists for the identifier.
    #[error("no recorded evaluation for cid: {0}")]
    UnknownCid(ContentId),
    /// Fingerprint computation failed.
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
    /// Evaluation cache error.
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Escalation engine error.
    #[error(transparent)]
    Escalation(#[from] EscalationError),
    /// An engine state lock was poisoned by a panicked thread.
    #[error("engine state lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

impl From<ExecutorError> for PipelineError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::CriticalLayer {
                layer_id,
                kind,
                message,
            } => Self::CriticalLayer {
                layer_id,
                kind,
                message,
            },
            ExecutorError::DeadlineExceeded {
                layer_id,
            } => Self::DeadlineExceeded {
                layer_id,
            },
        }
    }
}

// ============================================================================
// SECTION: Coherence Engine
// ============================================================================

/// Layered coherence evaluation engine.
pub struct CoherenceEngine<C> {
    /// Layer registry, read-only during a run.
    registry: Mutex<LayerRegistry>,
    /// Escalation rule engine.
    escalation: Mutex<EscalationEngine>,
    /// Live engine configuration.
    config: Mutex<EngineConfig>,
    /// Result cache implementation.
    cache: C,
    /// Layer executor.
    executor: LayerExecutor,
    /// Optional event-bus collaborator.
    events: Option<Arc<dyn EventPublisher>>,
    /// Optional observability collaborator.
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl<C> CoherenceEngine<C>
where
    C: EvaluationCache,
{
    /// Creates a new engine with an empty registry and built-in escalation
    /// rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration violates a bound.
    pub fn new(
        cache: C,
        config: EngineConfig,
        events: Option<Arc<dyn EventPublisher>>,
        metrics: Option<Arc<dyn MetricsSink>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            registry: Mutex::new(LayerRegistry::new()),
            escalation: Mutex::new(EscalationEngine::new()),
            config: Mutex::new(config),
            cache,
            executor: LayerExecutor::new(),
            events,
            metrics,
        })
    }

    /// Evaluates a content reference in the supplied context.
    ///
    /// Returns the cached evaluation verbatim on a fingerprint hit,
    /// including its original `evaluation_id`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when no layers are registered, a critical
    /// layer fails terminally, the evaluation deadline expires, or a
    /// collaborator fails. Failed evaluations are never cached.
    pub fn evaluate(&self, request: &EvaluationRequest) -> Result<Evaluation, PipelineError> {
        let started = Instant::now();
        let key = fingerprint(&request.cid, &request.context)?;

        if let Some(hit) = self.cache.get(&key)? {
            self.record_metric(&EvaluationMetricEvent {
                outcome: EvaluationOutcome::Ok,
                verdict: Some(hit.verdict),
                cache_hit: true,
                layer_count: hit.layers.len(),
                escalated: hit.escalation.is_some(),
                duration_ms: elapsed_ms(started),
            });
            return Ok(hit);
        }

        let result = self.evaluate_uncached(request, key, started);
        match &result {
            Ok(evaluation) => {
                self.publish(evaluation, request.correlation_id.clone());
                self.record_metric(&EvaluationMetricEvent {
                    outcome: EvaluationOutcome::Ok,
                    verdict: Some(evaluation.verdict),
                    cache_hit: false,
                    layer_count: evaluation.layers.len(),
                    escalated: evaluation.escalation.is_some(),
                    duration_ms: elapsed_ms(started),
                });
            }
            Err(_) => {
                self.record_metric(&EvaluationMetricEvent {
                    outcome: EvaluationOutcome::Error,
                    verdict: None,
                    cache_hit: false,
                    layer_count: 0,
                    escalated: false,
                    duration_ms: elapsed_ms(started),
                });
            }
        }
        result
    }

    /// Runs the full pipeline for a cache miss.
    fn evaluate_uncached(
        &self,
        request: &EvaluationRequest,
        key: Fingerprint,
        started: Instant,
    ) -> Result<Evaluation, PipelineError> {
        let config = self.config_snapshot()?;
        let layers = self.ordered_layers()?;
        if layers.is_empty() {
            return Err(PipelineError::NoLayersRegistered);
        }

        let deadline = started
            .checked_add(Duration::from_millis(config.evaluation_timeout_ms))
            .unwrap_or(started + DEADLINE_BACKSTOP);

        let mut layer_results: Vec<LayerResult> = Vec::with_capacity(layers.len());
        let mut evidence: Vec<Evidence> = Vec::new();
        for layer in &layers {
            let outcome = self.executor.run(
                layer,
                &request.cid,
                &request.context,
                request.requested_at,
                deadline,
            )?;
            evidence.extend(outcome.evidence);
            layer_results.push(outcome.result);
        }

        let outcome = aggregate(&layer_results, &evidence, &config);
        let mut evaluation = Evaluation {
            evaluation_id: key.evaluation_id(),
            cid: request.cid.clone(),
            verdict: outcome.verdict,
            confidence: outcome.confidence,
            risk_score: outcome.risk_score,
            layers: layer_results,
            evidence,
            escalation: None,
            metadata: EvaluationMetadata {
                evaluated_at: request.requested_at,
                evaluation_time_ms: elapsed_ms(started),
                fingerprint: key.clone(),
            },
        };

        evaluation.escalation = self
            .escalation
            .lock()
            .map_err(|_| PipelineError::LockPoisoned("escalation"))?
            .evaluate(&evaluation, &config, request.requested_at);

        self.cache.put(key, evaluation.clone())?;
        Ok(evaluation)
    }

    /// Evaluates a batch of cids against one context, reporting per-cid
    /// outcomes in input order.
    ///
    /// A failure for one cid is reported in place and never aborts the
    /// remainder of the batch.
    #[must_use]
    pub fn warmup_cache(
        &self,
        cids: &[ContentId],
        context: &Value,
        requested_at: Timestamp,
    ) -> Vec<WarmupOutcome> {
        let mut outcomes = Vec::with_capacity(cids.len());
        for cid in cids {
            let request = EvaluationRequest {
                cid: cid.clone(),
                context: context.clone(),
                requested_at,
                correlation_id: None,
            };
            let status = match self.evaluate(&request) {
                Ok(evaluation) => WarmupStatus::Completed {
                    evaluation: Box::new(evaluation),
                },
                Err(err) => WarmupStatus::Failed {
                    error: err.to_string(),
                },
            };
            outcomes.push(WarmupOutcome {
                cid: cid.clone(),
                status,
            });
        }
        outcomes
    }

    /// Replays the recorded evaluation for a `(cid, context)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownCid`] when no evaluation is recorded
    /// for the pair.
    pub fn replay(&self, cid: &ContentId, context: &Value) -> Result<Evaluation, PipelineError> {
        let key = fingerprint(cid, context)?;
        self.cache.get(&key)?.ok_or_else(|| PipelineError::UnknownCid(cid.clone()))
    }

    /// Registers a coherence layer, replacing any layer with the same id.
    ///
    /// The change is observed on the next evaluation; in-flight evaluations
    /// keep their layer snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::LockPoisoned`] when the registry lock is
    /// unusable.
    pub fn register_layer(&self, layer: CoherenceLayer) -> Result<(), PipelineError> {
        self.registry
            .lock()
            .map_err(|_| PipelineError::LockPoisoned("registry"))?
            .register(layer);
        Ok(())
    }

    /// Removes a layer by id, returning true when a layer was removed.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::LockPoisoned`] when the registry lock is
    /// unusable.
    pub fn unregister_layer(&self, layer_id: &LayerId) -> Result<bool, PipelineError> {
        Ok(self
            .registry
            .lock()
            .map_err(|_| PipelineError::LockPoisoned("registry"))?
            .unregister(layer_id))
    }

    /// Returns layer descriptors in execution order.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::LockPoisoned`] when the registry lock is
    /// unusable.
    pub fn layers(&self) -> Result<Vec<LayerDescriptor>, PipelineError> {
        Ok(self
            .registry
            .lock()
            .map_err(|_| PipelineError::LockPoisoned("registry"))?
            .descriptors())
    }

    /// Appends a custom escalation rule after the built-ins.
    ///
    /// # Errors
    ///
    /// Returns [`EscalationError::DuplicateRule`] (wrapped) when the rule id
    /// is taken.
    pub fn add_escalation_rule(&self, rule: EscalationRule) -> Result<(), PipelineError> {
        self.escalation
            .lock()
            .map_err(|_| PipelineError::LockPoisoned("escalation"))?
            .add_rule(rule)?;
        Ok(())
    }

    /// Returns escalation rule descriptors in evaluation order.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::LockPoisoned`] when the escalation lock is
    /// unusable.
    pub fn escalation_rules(&self) -> Result<Vec<EscalationRuleDescriptor>, PipelineError> {
        Ok(self
            .escalation
            .lock()
            .map_err(|_| PipelineError::LockPoisoned("escalation"))?
            .rules())
    }

    /// Merges a partial configuration update, returning the new live
    /// configuration.
    ///
    /// An invalid update leaves the previous configuration in force.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] (wrapped) when the merged configuration
    /// violates a bound.
    pub fn update_config(&self, update: &ConfigUpdate) -> Result<EngineConfig, PipelineError> {
        let mut guard =
            self.config.lock().map_err(|_| PipelineError::LockPoisoned("config"))?;
        let merged = guard.merged(update)?;
        *guard = merged;
        Ok(merged)
    }

    /// Returns the live engine configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::LockPoisoned`] when the config lock is
    /// unusable.
    pub fn config(&self) -> Result<EngineConfig, PipelineError> {
        self.config_snapshot()
    }

    /// Removes every cached evaluation.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] (wrapped) when the reset fails.
    pub fn reset_cache(&self) -> Result<(), PipelineError> {
        self.cache.reset()?;
        Ok(())
    }

    /// Returns the number of cached evaluations.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] (wrapped) when the count cannot be read.
    pub fn cache_len(&self) -> Result<usize, PipelineError> {
        Ok(self.cache.len()?)
    }

    /// Returns a copy of the live configuration.
    fn config_snapshot(&self) -> Result<EngineConfig, PipelineError> {
        Ok(*self.config.lock().map_err(|_| PipelineError::LockPoisoned("config"))?)
    }

    /// Returns the current execution-ordered layer snapshot.
    fn ordered_layers(&self) -> Result<Vec<CoherenceLayer>, PipelineError> {
        Ok(self
            .registry
            .lock()
            .map_err(|_| PipelineError::LockPoisoned("registry"))?
            .ordered())
    }

    /// Publishes the completion event, best-effort.
    fn publish(&self, evaluation: &Evaluation, correlation_id: Option<CorrelationId>) {
        if let Some(events) = &self.events {
            let event = EvaluationCompleted::from_evaluation(evaluation, correlation_id);
            // Fire-and-forget: a failed publish never fails the evaluation.
            let _ = events.publish(&event);
        }
    }

    /// Records a metric event, best-effort.
    fn record_metric(&self, event: &EvaluationMetricEvent) {
        if let Some(metrics) = &self.metrics {
            metrics.record(event);
        }
    }
}

// ============================================================================
// SECTION: Helper Functions
// ============================================================================

/// Returns elapsed wall-clock milliseconds since `started`.
fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
