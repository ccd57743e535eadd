// crates/coherence-engine-core/tests/escalation.rs
// ============================================================================
// Module: Escalation Precedence Tests
// Description: Ensures the first-match-wins escalation contract holds exactly.
// ============================================================================
//! ## Overview
//! Validates built-in rule precedence, the comparable-conflict carve-out,
//! low-confidence banding, and custom rule registration order.

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

use coherence_engine_core::CoherenceEngine;
use coherence_engine_core::CoherenceLayer;
use coherence_engine_core::ContentId;
use coherence_engine_core::EngineConfig;
use coherence_engine_core::EscalationCondition;
use coherence_engine_core::EscalationError;
use coherence_engine_core::EscalationPriority;
use coherence_engine_core::EscalationRule;
use coherence_engine_core::Evaluation;
use coherence_engine_core::EvaluationRequest;
use coherence_engine_core::EvidenceFragment;
use coherence_engine_core::HandlerError;
use coherence_engine_core::InMemoryEvaluationCache;
use coherence_engine_core::LayerHandler;
use coherence_engine_core::LayerId;
use coherence_engine_core::LayerJudgment;
use coherence_engine_core::PipelineError;
use coherence_engine_core::RuleId;
use coherence_engine_core::Timestamp;
use coherence_engine_core::Verdict;
use serde_json::Value;
use serde_json::json;

/// Handler that returns a fixed judgment.
struct StaticHandler {
    verdict: Verdict,
    confidence: f64,
    evidence: Vec<EvidenceFragment>,
}

impl LayerHandler for StaticHandler {
    fn judge(&self, _cid: &ContentId, _context: &Value) -> Result<LayerJudgment, HandlerError> {
        Ok(LayerJudgment {
            verdict: self.verdict,
            confidence: self.confidence,
            evidence: self.evidence.clone(),
        })
    }
}

/// Condition matching a fixed aggregate verdict.
struct VerdictIs {
    verdict: Verdict,
}

impl EscalationCondition for VerdictIs {
    fn matches(&self, evaluation: &Evaluation, _config: &EngineConfig) -> bool {
        evaluation.verdict == self.verdict
    }
}

fn engine() -> CoherenceEngine<InMemoryEvaluationCache> {
    CoherenceEngine::new(InMemoryEvaluationCache::new(), EngineConfig::default(), None, None)
        .unwrap()
}

fn static_layer(id: &str, priority: i64, verdict: Verdict, confidence: f64) -> CoherenceLayer {
    static_layer_with_evidence(id, priority, verdict, confidence, Vec::new())
}

fn static_layer_with_evidence(
    id: &str,
    priority: i64,
    verdict: Verdict,
    confidence: f64,
    evidence: Vec<EvidenceFragment>,
) -> CoherenceLayer {
    CoherenceLayer::new(
        LayerId::new(id),
        id.to_string(),
        priority,
        Arc::new(StaticHandler {
            verdict,
            confidence,
            evidence,
        }),
    )
}

fn request(cid: &str) -> EvaluationRequest {
    EvaluationRequest {
        cid: ContentId::new(cid),
        context: json!({}),
        requested_at: Timestamp::Logical(7),
        correlation_id: None,
    }
}

#[test]
fn comparable_conflict_resolves_to_conflicting_verdicts_not_high_risk() {
    let engine = engine();
    engine.register_layer(static_layer("layer-deny", 1, Verdict::Deny, 0.9)).unwrap();
    engine.register_layer(static_layer("layer-allow", 2, Verdict::Allow, 0.8)).unwrap();

    let evaluation = engine.evaluate(&request("cid-conflict")).unwrap();

    let escalation = evaluation.escalation.unwrap();
    assert_eq!(escalation.rule_id.as_str(), "conflicting-verdicts");
    assert_eq!(escalation.action, "expert-review");
    assert_eq!(escalation.priority, EscalationPriority::High);
    assert_eq!(escalation.created_at, Timestamp::Logical(7));
}

#[test]
fn strong_deny_without_comparable_allow_is_high_risk() {
    let engine = engine();
    engine.register_layer(static_layer("layer-deny", 1, Verdict::Deny, 0.9)).unwrap();
    engine.register_layer(static_layer("layer-allow", 2, Verdict::Allow, 0.2)).unwrap();

    let evaluation = engine.evaluate(&request("cid-high-risk")).unwrap();

    assert_eq!(evaluation.verdict, Verdict::Deny);
    let escalation = evaluation.escalation.unwrap();
    assert_eq!(escalation.rule_id.as_str(), "high-risk-content");
    assert_eq!(escalation.action, "immediate-review");
    assert_eq!(escalation.priority, EscalationPriority::Critical);
}

#[test]
fn high_risk_evidence_score_triggers_high_risk_without_deny() {
    let engine = engine();
    engine
        .register_layer(static_layer_with_evidence(
            "layer-risk",
            1,
            Verdict::Allow,
            0.9,
            vec![EvidenceFragment::risk_indicator(0.95)],
        ))
        .unwrap();

    let evaluation = engine.evaluate(&request("cid-risk-evidence")).unwrap();

    assert!(evaluation.risk_score >= 0.95);
    let escalation = evaluation.escalation.unwrap();
    assert_eq!(escalation.rule_id.as_str(), "high-risk-content");
}

#[test]
fn conflicting_verdicts_outranks_low_confidence() {
    let engine = engine();
    engine.register_layer(static_layer("layer-deny", 1, Verdict::Deny, 0.3)).unwrap();
    engine.register_layer(static_layer("layer-allow", 2, Verdict::Allow, 0.25)).unwrap();

    let evaluation = engine.evaluate(&request("cid-precedence")).unwrap();

    assert!(evaluation.confidence < 0.5);
    let escalation = evaluation.escalation.unwrap();
    assert_eq!(escalation.rule_id.as_str(), "conflicting-verdicts");
}

#[test]
fn single_low_confidence_layer_raises_human_review() {
    let engine = engine();
    engine.register_layer(static_layer("layer-weak", 1, Verdict::Allow, 0.3)).unwrap();

    let evaluation = engine.evaluate(&request("cid-low")).unwrap();

    let escalation = evaluation.escalation.unwrap();
    assert_eq!(escalation.rule_id.as_str(), "low-confidence");
    assert_eq!(escalation.action, "human-review");
    assert_eq!(escalation.priority, EscalationPriority::Medium);
}

#[test]
fn widespread_low_confidence_escalates_to_expert_review() {
    let engine = engine();
    engine.register_layer(static_layer("layer-weak-a", 1, Verdict::Allow, 0.3)).unwrap();
    engine.register_layer(static_layer("layer-weak-b", 2, Verdict::Unknown, 0.2)).unwrap();

    let evaluation = engine.evaluate(&request("cid-widespread")).unwrap();

    let escalation = evaluation.escalation.unwrap();
    assert_eq!(escalation.rule_id.as_str(), "widespread-low-confidence");
    assert_eq!(escalation.action, "expert-review");
    assert_eq!(escalation.priority, EscalationPriority::High);
}

#[test]
fn confident_allow_raises_no_escalation() {
    let engine = engine();
    engine.register_layer(static_layer("layer-good", 1, Verdict::Allow, 0.95)).unwrap();

    let evaluation = engine.evaluate(&request("cid-clean")).unwrap();

    assert_eq!(evaluation.verdict, Verdict::Allow);
    assert!(evaluation.escalation.is_none());
}

#[test]
fn custom_rules_run_after_builtins_in_registration_order() {
    let engine = engine();
    engine.register_layer(static_layer("layer-good", 1, Verdict::Allow, 0.95)).unwrap();

    engine
        .add_escalation_rule(EscalationRule::new(
            RuleId::new("allow-audit"),
            Arc::new(VerdictIs {
                verdict: Verdict::Allow,
            }),
            "audit-sample",
            EscalationPriority::Low,
        ))
        .unwrap();
    engine
        .add_escalation_rule(EscalationRule::new(
            RuleId::new("allow-audit-secondary"),
            Arc::new(VerdictIs {
                verdict: Verdict::Allow,
            }),
            "audit-secondary",
            EscalationPriority::Low,
        ))
        .unwrap();

    let evaluation = engine.evaluate(&request("cid-custom")).unwrap();

    let escalation = evaluation.escalation.unwrap();
    assert_eq!(escalation.rule_id.as_str(), "allow-audit");
    assert_eq!(escalation.action, "audit-sample");
}

#[test]
fn duplicate_rule_ids_are_rejected() {
    let engine = engine();
    let rule = || {
        EscalationRule::new(
            RuleId::new("allow-audit"),
            Arc::new(VerdictIs {
                verdict: Verdict::Allow,
            }),
            "audit-sample",
            EscalationPriority::Low,
        )
    };
    engine.add_escalation_rule(rule()).unwrap();

    let err = engine.add_escalation_rule(rule()).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Escalation(EscalationError::DuplicateRule(_))
    ));

    let builtin_clash = EscalationRule::new(
        RuleId::new("low-confidence"),
        Arc::new(VerdictIs {
            verdict: Verdict::Unknown,
        }),
        "shadow-review",
        EscalationPriority::Low,
    );
    assert!(engine.add_escalation_rule(builtin_clash).is_err());
}

#[test]
fn rule_listing_keeps_builtins_first_in_precedence_order() {
    let engine = engine();
    engine
        .add_escalation_rule(
            EscalationRule::new(
                RuleId::new("custom-tail"),
                Arc::new(VerdictIs {
                    verdict: Verdict::Warn,
                }),
                "warn-review",
                EscalationPriority::Low,
            )
            .with_timeout_ms(60_000),
        )
        .unwrap();

    let rules = engine.escalation_rules().unwrap();
    let ids: Vec<&str> = rules.iter().map(|rule| rule.rule_id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "high-risk-content",
            "conflicting-verdicts",
            "widespread-low-confidence",
            "low-confidence",
            "custom-tail",
        ]
    );
    assert!(rules[0].builtin);
    assert!(!rules[4].builtin);
    assert_eq!(rules[4].timeout_ms, Some(60_000));
}
