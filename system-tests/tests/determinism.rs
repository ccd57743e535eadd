// system-tests/tests/determinism.rs
// ============================================================================
// Module: Determinism System Tests
// Description: Replay equality guarantees over the public engine surface.
// ============================================================================
//! ## Overview
//! Ensures identical `(cid, context)` pairs replay byte-identical
//! evaluations, context canonicalization ignores key order, and identifiers
//! reproduce across cache resets.

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

use coherence_engine_core::ContentId;
use coherence_engine_core::Timestamp;
use coherence_engine_core::Verdict;
use coherence_engine_core::WarmupStatus;
use serde_json::json;
use system_tests::harness::ScriptedHandler;
use system_tests::harness::engine;
use system_tests::harness::layer;
use system_tests::harness::request;

#[test]
fn identical_requests_replay_identical_evaluations() {
    let engine = engine();
    engine
        .register_layer(layer("screen", 1, ScriptedHandler::new(Verdict::Allow, 0.9)))
        .unwrap();

    let context = json!({ "channel": "upload", "locale": "en" });
    let first = engine.evaluate(&request("cid-replay", context.clone())).unwrap();
    let second = engine.evaluate(&request("cid-replay", context.clone())).unwrap();
    let replayed = engine.replay(&ContentId::new("cid-replay"), &context).unwrap();

    assert_eq!(first, second);
    assert_eq!(first, replayed);
    let reserialized: coherence_engine_core::Evaluation =
        serde_json::from_str(&serde_json::to_string(&first).unwrap()).unwrap();
    assert_eq!(reserialized, first);
}

#[test]
fn context_key_order_does_not_change_the_fingerprint() {
    let engine = engine();
    engine
        .register_layer(layer("screen", 1, ScriptedHandler::new(Verdict::Allow, 0.9)))
        .unwrap();

    let first = engine
        .evaluate(&request("cid-order", json!({ "a": 1, "b": { "x": true, "y": false } })))
        .unwrap();
    let second = engine
        .evaluate(&request("cid-order", json!({ "b": { "y": false, "x": true }, "a": 1 })))
        .unwrap();

    assert_eq!(first.evaluation_id, second.evaluation_id);
    assert_eq!(engine.cache_len().unwrap(), 1);
}

#[test]
fn evaluation_ids_reproduce_across_cache_resets() {
    let engine = engine();
    engine
        .register_layer(layer("screen", 1, ScriptedHandler::new(Verdict::Allow, 0.9)))
        .unwrap();

    let context = json!({ "tenant": "t-1" });
    let first = engine.evaluate(&request("cid-reset", context.clone())).unwrap();
    engine.reset_cache().unwrap();
    let second = engine.evaluate(&request("cid-reset", context)).unwrap();

    assert_eq!(first.evaluation_id, second.evaluation_id);
    assert_eq!(first.verdict, second.verdict);
}

#[test]
fn warmup_and_evaluate_agree_on_identifiers() {
    let engine = engine();
    engine
        .register_layer(layer("screen", 1, ScriptedHandler::new(Verdict::Allow, 0.9)))
        .unwrap();

    let cids = vec![
        ContentId::new("cid-wa"),
        ContentId::new("cid-wb"),
        ContentId::new("cid-wc"),
    ];
    let context = json!({ "batch": true });
    let outcomes = engine.warmup_cache(&cids, &context, Timestamp::Logical(1));
    assert_eq!(outcomes.len(), 3);

    for outcome in outcomes {
        let warmed = match outcome.status {
            WarmupStatus::Completed {
                evaluation,
            } => *evaluation,
            WarmupStatus::Failed {
                error,
            } => panic!("warmup failed: {error}"),
        };
        let mut follow_up = request(outcome.cid.as_str(), context.clone());
        follow_up.requested_at = Timestamp::Logical(99);
        let replayed = engine.evaluate(&follow_up).unwrap();
        assert_eq!(warmed, replayed);
    }
}
