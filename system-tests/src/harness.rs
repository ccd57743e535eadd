// system-tests/src/harness.rs
// ============================================================================
// Module: System Test Harness
// Description: Scripted layer handlers and recording collaborators.
// Purpose: Build engines with predictable layers for end-to-end scenarios.
// Dependencies: coherence-engine-core, serde_json
// ============================================================================

//! ## Overview
//! The harness provides scripted handlers (fixed verdicts, scripted
//! failures, configurable delays) and recording event/metric collaborators,
//! all wired through the public engine API so system tests observe exactly
//! what production callers would.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use coherence_engine_core::CoherenceEngine;
use coherence_engine_core::CoherenceLayer;
use coherence_engine_core::ContentId;
use coherence_engine_core::EngineConfig;
use coherence_engine_core::EvaluationCompleted;
use coherence_engine_core::EvaluationMetricEvent;
use coherence_engine_core::EvaluationRequest;
use coherence_engine_core::EventPublisher;
use coherence_engine_core::EvidenceFragment;
use coherence_engine_core::HandlerError;
use coherence_engine_core::InMemoryEvaluationCache;
use coherence_engine_core::LayerHandler;
use coherence_engine_core::LayerId;
use coherence_engine_core::LayerJudgment;
use coherence_engine_core::MetricsSink;
use coherence_engine_core::PublishError;
use coherence_engine_core::Timestamp;
use coherence_engine_core::Verdict;
use serde_json::Value;

// ============================================================================
// SECTION: Scripted Handlers
// ============================================================================

/// Handler returning a fixed judgment, optionally after a delay.
pub struct ScriptedHandler {
    /// Verdict to return.
    verdict: Verdict,
    /// Confidence to return.
    confidence: f64,
    /// Evidence fragments to attach.
    evidence: Vec<EvidenceFragment>,
    /// Optional delay before answering, in milliseconds.
    delay_ms: u64,
    /// Invocation counter.
    calls: Arc<AtomicU32>,
}

impl ScriptedHandler {
    /// Creates a handler with the given verdict and confidence.
    #[must_use]
    pub fn new(verdict: Verdict, confidence: f64) -> Self {
        Self {
            verdict,
            confidence,
            evidence: Vec::new(),
            delay_ms: 0,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Attaches evidence fragments to every judgment.
    #[must_use]
    pub fn with_evidence(mut self, evidence: Vec<EvidenceFragment>) -> Self {
        self.evidence = evidence;
        self
    }

    /// Delays every judgment by the given milliseconds.
    #[must_use]
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Returns the shared invocation counter.
    #[must_use]
    pub fn calls(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.calls)
    }
}

impl LayerHandler for ScriptedHandler {
    fn judge(&self, _cid: &ContentId, _context: &Value) -> Result<LayerJudgment, HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.delay_ms > 0 {
            thread::sleep(Duration::from_millis(self.delay_ms));
        }
        Ok(LayerJudgment {
            verdict: self.verdict,
            confidence: self.confidence,
            evidence: self.evidence.clone(),
        })
    }
}

/// Handler failing a fixed number of times before succeeding.
pub struct FlakyHandler {
    /// Failures before the first success.
    failures_before_success: u32,
    /// Invocation counter.
    calls: Arc<AtomicU32>,
}

impl FlakyHandler {
    /// Creates a handler failing `failures_before_success` times first.
    #[must_use]
    pub fn new(failures_before_success: u32) -> Self {
        Self {
            failures_before_success,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Returns the shared invocation counter.
    #[must_use]
    pub fn calls(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.calls)
    }
}

impl LayerHandler for FlakyHandler {
    fn judge(&self, _cid: &ContentId, _context: &Value) -> Result<LayerJudgment, HandlerError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures_before_success {
            return Err(HandlerError::Handler(format!("transient failure {call}")));
        }
        Ok(LayerJudgment {
            verdict: Verdict::Allow,
            confidence: 0.9,
            evidence: Vec::new(),
        })
    }
}

// ============================================================================
// SECTION: Recording Collaborators
// ============================================================================

/// Event publisher recording every published event.
#[derive(Default)]
pub struct RecordingPublisher {
    /// Recorded events.
    events: Mutex<Vec<EvaluationCompleted>>,
}

impl RecordingPublisher {
    /// Returns a snapshot of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<EvaluationCompleted> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: &EvaluationCompleted) -> Result<(), PublishError> {
        self.events
            .lock()
            .map_err(|_| PublishError::Publish("recording mutex poisoned".to_string()))?
            .push(event.clone());
        Ok(())
    }
}

/// Metrics sink recording every metric event.
#[derive(Default)]
pub struct RecordingMetrics {
    /// Recorded metric events.
    events: Mutex<Vec<EvaluationMetricEvent>>,
}

impl RecordingMetrics {
    /// Returns a snapshot of the recorded metric events.
    #[must_use]
    pub fn events(&self) -> Vec<EvaluationMetricEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl MetricsSink for RecordingMetrics {
    fn record(&self, event: &EvaluationMetricEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event.clone());
        }
    }
}

// ============================================================================
// SECTION: Engine Construction
// ============================================================================

/// Builds an engine over a fresh in-memory cache with default config.
///
/// # Panics
///
/// Panics when the default configuration is rejected, which would be a
/// harness bug.
#[must_use]
pub fn engine() -> CoherenceEngine<InMemoryEvaluationCache> {
    engine_with(EngineConfig::default(), None, None)
}

/// Builds an engine with explicit config and optional collaborators.
///
/// # Panics
///
/// Panics when the configuration is rejected, which would be a harness bug.
#[must_use]
pub fn engine_with(
    config: EngineConfig,
    events: Option<Arc<dyn EventPublisher>>,
    metrics: Option<Arc<dyn MetricsSink>>,
) -> CoherenceEngine<InMemoryEvaluationCache> {
    match CoherenceEngine::new(InMemoryEvaluationCache::new(), config, events, metrics) {
        Ok(engine) => engine,
        Err(err) => unreachable!("default harness config must validate: {err}"),
    }
}

/// Builds a scripted layer with the given id, priority, and handler.
#[must_use]
pub fn layer(id: &str, priority: i64, handler: impl LayerHandler + 'static) -> CoherenceLayer {
    CoherenceLayer::new(LayerId::new(id), id.to_string(), priority, Arc::new(handler))
}

/// Builds an evaluation request with a logical timestamp.
#[must_use]
pub fn request(cid: &str, context: Value) -> EvaluationRequest {
    EvaluationRequest {
        cid: ContentId::new(cid),
        context,
        requested_at: Timestamp::Logical(1),
        correlation_id: None,
    }
}
