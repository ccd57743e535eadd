// crates/coherence-engine-core/tests/timeouts.rs
// ============================================================================
// Module: Timeout Handling Tests
// Description: Ensures layer and evaluation timeouts degrade or abort correctly.
// ============================================================================
//! ## Overview
//! Validates per-layer timeout synthesis, critical timeout propagation, and
//! the whole-pipeline deadline.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use coherence_engine_core::CoherenceEngine;
use coherence_engine_core::CoherenceLayer;
use coherence_engine_core::ContentId;
use coherence_engine_core::EVIDENCE_KIND_LAYER_ERROR;
use coherence_engine_core::EngineConfig;
use coherence_engine_core::EvaluationRequest;
use coherence_engine_core::HandlerError;
use coherence_engine_core::InMemoryEvaluationCache;
use coherence_engine_core::LayerFailureKind;
use coherence_engine_core::LayerHandler;
use coherence_engine_core::LayerId;
use coherence_engine_core::LayerJudgment;
use coherence_engine_core::PipelineError;
use coherence_engine_core::Timestamp;
use coherence_engine_core::Verdict;
use serde_json::Value;
use serde_json::json;

/// Handler that sleeps before answering.
struct SlowHandler {
    delay_ms: u64,
}

impl LayerHandler for SlowHandler {
    fn judge(&self, _cid: &ContentId, _context: &Value) -> Result<LayerJudgment, HandlerError> {
        thread::sleep(Duration::from_millis(self.delay_ms));
        Ok(LayerJudgment {
            verdict: Verdict::Allow,
            confidence: 0.9,
            evidence: Vec::new(),
        })
    }
}

/// Handler that answers immediately.
struct FastHandler;

impl LayerHandler for FastHandler {
    fn judge(&self, _cid: &ContentId, _context: &Value) -> Result<LayerJudgment, HandlerError> {
        Ok(LayerJudgment {
            verdict: Verdict::Allow,
            confidence: 0.9,
            evidence: Vec::new(),
        })
    }
}

fn engine_with_timeout(evaluation_timeout_ms: u64) -> CoherenceEngine<InMemoryEvaluationCache> {
    let config = EngineConfig {
        evaluation_timeout_ms,
        ..EngineConfig::default()
    };
    CoherenceEngine::new(InMemoryEvaluationCache::new(), config, None, None).unwrap()
}

fn request(cid: &str) -> EvaluationRequest {
    EvaluationRequest {
        cid: ContentId::new(cid),
        context: json!({}),
        requested_at: Timestamp::Logical(1),
        correlation_id: None,
    }
}

#[test]
fn slow_layer_with_timeout_degrades_without_aborting() {
    let engine = engine_with_timeout(5_000);
    engine
        .register_layer(
            CoherenceLayer::new(
                LayerId::new("layer-slow"),
                "Slow Layer",
                1,
                Arc::new(SlowHandler {
                    delay_ms: 200,
                }),
            )
            .with_timeout_ms(100),
        )
        .unwrap();
    engine
        .register_layer(CoherenceLayer::new(
            LayerId::new("layer-fast"),
            "Fast Layer",
            2,
            Arc::new(FastHandler),
        ))
        .unwrap();

    let evaluation = engine.evaluate(&request("cid-timeout")).unwrap();

    let slow = &evaluation.layers[0];
    assert_eq!(slow.verdict, Verdict::Unknown);
    assert!(slow.confidence.abs() < f64::EPSILON);
    let failure = slow.failure.as_ref().unwrap();
    assert_eq!(failure.kind, LayerFailureKind::Timeout);
    assert!(
        evaluation
            .evidence
            .iter()
            .any(|record| record.kind == EVIDENCE_KIND_LAYER_ERROR
                && record.source_layer.as_ref().map(coherence_engine_core::LayerId::as_str)
                    == Some("layer-slow"))
    );

    let fast = &evaluation.layers[1];
    assert_eq!(fast.verdict, Verdict::Allow);
    assert!(fast.failure.is_none());
}

#[test]
fn critical_layer_timeout_aborts_and_caches_nothing() {
    let engine = engine_with_timeout(5_000);
    engine
        .register_layer(
            CoherenceLayer::new(
                LayerId::new("layer-critical-slow"),
                "Critical Slow Layer",
                1,
                Arc::new(SlowHandler {
                    delay_ms: 200,
                }),
            )
            .with_timeout_ms(50)
            .critical(),
        )
        .unwrap();

    let err = engine.evaluate(&request("cid-critical-timeout")).unwrap_err();
    match err {
        PipelineError::CriticalLayer {
            layer_id,
            kind,
            message,
        } => {
            assert_eq!(layer_id.as_str(), "layer-critical-slow");
            assert_eq!(kind, LayerFailureKind::Timeout);
            assert!(message.contains("timed out"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(engine.cache_len().unwrap(), 0);
}

#[test]
fn evaluation_deadline_fails_the_whole_pipeline() {
    let engine = engine_with_timeout(50);
    engine
        .register_layer(CoherenceLayer::new(
            LayerId::new("layer-unbounded-slow"),
            "Unbounded Slow Layer",
            1,
            Arc::new(SlowHandler {
                delay_ms: 300,
            }),
        ))
        .unwrap();

    let err = engine.evaluate(&request("cid-deadline")).unwrap_err();
    assert!(matches!(err, PipelineError::DeadlineExceeded { .. }));
    assert_eq!(engine.cache_len().unwrap(), 0);
}

#[test]
fn layer_within_timeout_completes_normally() {
    let engine = engine_with_timeout(5_000);
    engine
        .register_layer(
            CoherenceLayer::new(
                LayerId::new("layer-quick"),
                "Quick Layer",
                1,
                Arc::new(SlowHandler {
                    delay_ms: 10,
                }),
            )
            .with_timeout_ms(500),
        )
        .unwrap();

    let evaluation = engine.evaluate(&request("cid-in-time")).unwrap();
    assert_eq!(evaluation.layers[0].verdict, Verdict::Allow);
    assert!(evaluation.layers[0].failure.is_none());
    assert_eq!(engine.cache_len().unwrap(), 1);
}
