// crates/coherence-engine-core/src/runtime/mod.rs
// ============================================================================
// Module: Coherence Engine Runtime
// Description: Registry, executor, pipeline, escalation, and cache runtime.
// Purpose: Execute coherence evaluations against registered layers.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement the evaluation pipeline and its collaborators.
//! All API surfaces must call into the same pipeline logic to preserve the
//! ordering, determinism, and escalation-precedence contracts.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod aggregate;
pub mod builtin;
pub mod cache;
pub mod escalation;
pub mod executor;
pub mod pipeline;
pub mod registry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use aggregate::AggregateOutcome;
pub use aggregate::RISK_CONTRIBUTOR_WEIGHT;
pub use aggregate::aggregate;
pub use builtin::IDENTITY_VERIFICATION_LAYER_ID;
pub use builtin::IdentityVerificationLayer;
pub use builtin::PERMISSION_VALIDATION_LAYER_ID;
pub use builtin::PermissionValidationLayer;
pub use builtin::identity_verification_layer;
pub use builtin::permission_validation_layer;
pub use cache::InMemoryEvaluationCache;
pub use cache::SharedEvaluationCache;
pub use escalation::COMPARABLE_CONFIDENCE_DELTA;
pub use escalation::EscalationCondition;
pub use escalation::EscalationEngine;
pub use escalation::EscalationError;
pub use escalation::EscalationRule;
pub use escalation::EscalationRuleDescriptor;
pub use escalation::HIGH_RISK_DENY_CONFIDENCE;
pub use escalation::HIGH_RISK_EVIDENCE_SCORE;
pub use executor::ExecutorError;
pub use executor::LayerExecutor;
pub use executor::LayerOutcome;
pub use pipeline::CoherenceEngine;
pub use pipeline::EvaluationRequest;
pub use pipeline::PipelineError;
pub use registry::LayerRegistry;
