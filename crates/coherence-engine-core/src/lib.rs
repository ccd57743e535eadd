// crates/coherence-engine-core/src/lib.rs
// ============================================================================
// Module: Coherence Engine Core Library
// Description: Public API surface for the coherence evaluation engine.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The coherence engine runs an ordered set of pluggable judgment layers
//! over a content reference and an invocation context, aggregates their
//! verdicts into one decision, and raises an escalation when the result is
//! uncertain, risky, or contradictory. It is backend-agnostic and
//! integrates through explicit interfaces rather than embedding into
//! transport or storage frameworks.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::CacheError;
pub use interfaces::EvaluationCache;
pub use interfaces::EventPublisher;
pub use interfaces::HandlerError;
pub use interfaces::LayerHandler;
pub use interfaces::LayerJudgment;
pub use interfaces::MetricsSink;
pub use interfaces::PublishError;
pub use runtime::CoherenceEngine;
pub use runtime::EscalationCondition;
pub use runtime::EscalationEngine;
pub use runtime::EscalationError;
pub use runtime::EscalationRule;
pub use runtime::EscalationRuleDescriptor;
pub use runtime::EvaluationRequest;
pub use runtime::ExecutorError;
pub use runtime::InMemoryEvaluationCache;
pub use runtime::LayerExecutor;
pub use runtime::LayerOutcome;
pub use runtime::LayerRegistry;
pub use runtime::PipelineError;
pub use runtime::SharedEvaluationCache;
pub use runtime::identity_verification_layer;
pub use runtime::permission_validation_layer;
