// crates/coherence-engine-core/src/runtime/escalation.rs
// ============================================================================
// Module: Coherence Escalation Engine
// Description: Ordered first-match-wins escalation rule evaluation.
// Purpose: Select at most one escalation action for a completed evaluation.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Built-in rules and custom rules live in ONE ordered list evaluated
//! top-to-bottom; the first satisfied rule wins. The built-in precedence is
//! behaviorally observable and must hold exactly:
//!
//! 1. `high-risk-content`: a strong Deny with no comparable Allow, or a
//!    risk-evidence score at or above [`HIGH_RISK_EVIDENCE_SCORE`].
//! 2. `conflicting-verdicts`: an Allow and a Deny within
//!    [`COMPARABLE_CONFIDENCE_DELTA`] of each other. The comparable-Allow
//!    carve-out in rule 1 is what makes a comparable conflict resolve here
//!    rather than to `high-risk-content`.
//! 3. `widespread-low-confidence`: aggregate confidence below the
//!    escalation threshold with two or more individually low layers.
//! 4. `low-confidence`: aggregate confidence below the escalation
//!    threshold.
//!
//! Custom rules are appended after the built-ins and checked in
//! registration order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::config::EngineConfig;
use crate::core::evaluation::Escalation;
use crate::core::evaluation::EscalationPriority;
use crate::core::evaluation::Evaluation;
use crate::core::identifiers::RuleId;
use crate::core::time::Timestamp;
use crate::core::verdict::Verdict;
use crate::runtime::aggregate::best_confidence;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum confidence gap for Allow/Deny verdicts to count as comparable.
pub const COMPARABLE_CONFIDENCE_DELTA: f64 = 0.2;
/// Deny confidence at or above which content is high risk.
pub const HIGH_RISK_DENY_CONFIDENCE: f64 = 0.8;
/// Risk-evidence score at or above which content is high risk.
pub const HIGH_RISK_EVIDENCE_SCORE: f64 = 0.9;
/// Layer count at which low confidence counts as widespread.
const WIDESPREAD_LOW_CONFIDENCE_LAYERS: usize = 2;

// ============================================================================
// SECTION: Rule Condition
// ============================================================================

/// Predicate deciding whether a rule applies to a completed evaluation.
///
/// Conditions observe the pre-escalation evaluation (its `escalation` field
/// is still unset) together with the live configuration.
pub trait EscalationCondition: Send + Sync {
    /// Returns true when the rule should fire for the evaluation.
    fn matches(&self, evaluation: &Evaluation, config: &EngineConfig) -> bool;
}

// ============================================================================
// SECTION: Escalation Rule
// ============================================================================

/// One ordered escalation rule.
///
/// # Invariants
/// - `rule_id` is unique within one escalation engine.
#[derive(Clone)]
pub struct EscalationRule {
    /// Rule identifier.
    pub rule_id: RuleId,
    /// Rule condition.
    pub condition: Arc<dyn EscalationCondition>,
    /// Action label raised when the rule fires.
    pub action: String,
    /// Priority band of the raised escalation.
    pub priority: EscalationPriority,
    /// Optional review deadline carried to the escalation consumer.
    pub timeout_ms: Option<u64>,
}

impl EscalationRule {
    /// Creates a rule with no review deadline.
    #[must_use]
    pub fn new(
        rule_id: RuleId,
        condition: Arc<dyn EscalationCondition>,
        action: impl Into<String>,
        priority: EscalationPriority,
    ) -> Self {
        Self {
            rule_id,
            condition,
            action: action.into(),
            priority,
            timeout_ms: None,
        }
    }

    /// Sets the review deadline.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Returns the serializable descriptor for this rule.
    #[must_use]
    fn descriptor(&self, builtin: bool) -> EscalationRuleDescriptor {
        EscalationRuleDescriptor {
            rule_id: self.rule_id.clone(),
            action: self.action.clone(),
            priority: self.priority,
            timeout_ms: self.timeout_ms,
            builtin,
        }
    }
}

impl fmt::Debug for EscalationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EscalationRule")
            .field("rule_id", &self.rule_id)
            .field("action", &self.action)
            .field("priority", &self.priority)
            .field("timeout_ms", &self.timeout_ms)
            .finish_non_exhaustive()
    }
}

/// Serializable view of a registered escalation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationRuleDescriptor {
    /// Rule identifier.
    pub rule_id: RuleId,
    /// Action label.
    pub action: String,
    /// Priority band.
    pub priority: EscalationPriority,
    /// Optional review deadline.
    pub timeout_ms: Option<u64>,
    /// True for the fixed built-in rules.
    pub builtin: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Escalation engine errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EscalationError {
    /// A rule with the same id is already registered.
    #[error("escalation rule already registered: {0}")]
    DuplicateRule(String),
}

// ============================================================================
// SECTION: Escalation Engine
// ============================================================================

/// Ordered first-match-wins escalation rule evaluator.
#[derive(Debug)]
pub struct EscalationEngine {
    /// Built-ins first, then custom rules in registration order.
    rules: Vec<EscalationRule>,
    /// Number of leading built-in rules.
    builtin_count: usize,
}

impl Default for EscalationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EscalationEngine {
    /// Creates an engine seeded with the built-in rule set.
    #[must_use]
    pub fn new() -> Self {
        let rules = builtin_rules();
        let builtin_count = rules.len();
        Self {
            rules,
            builtin_count,
        }
    }

    /// Appends a custom rule after the built-ins.
    ///
    /// # Errors
    ///
    /// Returns [`EscalationError::DuplicateRule`] when the id is taken,
    /// including by a built-in.
    pub fn add_rule(&mut self, rule: EscalationRule) -> Result<(), EscalationError> {
        if self.rules.iter().any(|existing| existing.rule_id == rule.rule_id) {
            return Err(EscalationError::DuplicateRule(rule.rule_id.to_string()));
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Returns descriptors for every rule in evaluation order.
    #[must_use]
    pub fn rules(&self) -> Vec<EscalationRuleDescriptor> {
        self.rules
            .iter()
            .enumerate()
            .map(|(index, rule)| rule.descriptor(index < self.builtin_count))
            .collect()
    }

    /// Evaluates the rules against a completed evaluation.
    ///
    /// Returns the escalation raised by the first satisfied rule, or `None`
    /// when no rule matched.
    #[must_use]
    pub fn evaluate(
        &self,
        evaluation: &Evaluation,
        config: &EngineConfig,
        created_at: Timestamp,
    ) -> Option<Escalation> {
        self.rules
            .iter()
            .find(|rule| rule.condition.matches(evaluation, config))
            .map(|rule| Escalation {
                action: rule.action.clone(),
                rule_id: rule.rule_id.clone(),
                priority: rule.priority,
                created_at,
            })
    }
}

// ============================================================================
// SECTION: Built-In Rules
// ============================================================================

/// Builds the fixed built-in rule list in precedence order.
fn builtin_rules() -> Vec<EscalationRule> {
    vec![
        EscalationRule::new(
            RuleId::new("high-risk-content"),
            Arc::new(HighRiskContent),
            "immediate-review",
            EscalationPriority::Critical,
        ),
        EscalationRule::new(
            RuleId::new("conflicting-verdicts"),
            Arc::new(ConflictingVerdicts),
            "expert-review",
            EscalationPriority::High,
        ),
        EscalationRule::new(
            RuleId::new("widespread-low-confidence"),
            Arc::new(WidespreadLowConfidence),
            "expert-review",
            EscalationPriority::High,
        ),
        EscalationRule::new(
            RuleId::new("low-confidence"),
            Arc::new(LowConfidence),
            "human-review",
            EscalationPriority::Medium,
        ),
    ]
}

/// High-risk content: a strong Deny with no comparable Allow, or a
/// high-scoring risk-evidence record.
struct HighRiskContent;

impl EscalationCondition for HighRiskContent {
    fn matches(&self, evaluation: &Evaluation, _config: &EngineConfig) -> bool {
        let strong_deny = best_confidence(&evaluation.layers, Verdict::Deny)
            .is_some_and(|deny| deny >= HIGH_RISK_DENY_CONFIDENCE);
        if strong_deny && !comparable_conflict(evaluation) {
            return true;
        }
        evaluation
            .evidence
            .iter()
            .filter_map(|record| record.risk_score())
            .any(|score| score >= HIGH_RISK_EVIDENCE_SCORE)
    }
}

/// Conflicting verdicts: an Allow and a Deny with comparable confidence.
struct ConflictingVerdicts;

impl EscalationCondition for ConflictingVerdicts {
    fn matches(&self, evaluation: &Evaluation, _config: &EngineConfig) -> bool {
        comparable_conflict(evaluation)
    }
}

/// Widespread low confidence: low aggregate plus two or more low layers.
struct WidespreadLowConfidence;

impl EscalationCondition for WidespreadLowConfidence {
    fn matches(&self, evaluation: &Evaluation, config: &EngineConfig) -> bool {
        if evaluation.confidence >= config.escalation_threshold {
            return false;
        }
        let low_layers = evaluation
            .layers
            .iter()
            .filter(|layer| layer.confidence < config.escalation_threshold)
            .count();
        low_layers >= WIDESPREAD_LOW_CONFIDENCE_LAYERS
    }
}

/// Low confidence: aggregate confidence below the escalation threshold.
struct LowConfidence;

impl EscalationCondition for LowConfidence {
    fn matches(&self, evaluation: &Evaluation, config: &EngineConfig) -> bool {
        evaluation.confidence < config.escalation_threshold
    }
}

// ============================================================================
// SECTION: Helper Functions
// ============================================================================

/// Returns true when an Allow and a Deny layer sit within the comparable
/// confidence delta.
fn comparable_conflict(evaluation: &Evaluation) -> bool {
    let allow = best_confidence(&evaluation.layers, Verdict::Allow);
    let deny = best_confidence(&evaluation.layers, Verdict::Deny);
    match (allow, deny) {
        (Some(allow), Some(deny)) => (allow - deny).abs() <= COMPARABLE_CONFIDENCE_DELTA,
        _ => false,
    }
}
