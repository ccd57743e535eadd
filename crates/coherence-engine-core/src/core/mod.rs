// crates/coherence-engine-core/src/core/mod.rs
// ============================================================================
// Module: Coherence Engine Core Types
// Description: Canonical evaluation, layer, and escalation structures.
// Purpose: Provide stable, serializable types for coherence evaluations.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core types define the value model of the engine: identifiers, verdicts,
//! evidence, layer records, evaluations, escalations, configuration, and
//! the events derived from them. These types are the canonical source of
//! truth for any derived API surfaces.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod config;
pub mod evaluation;
pub mod events;
pub mod evidence;
pub mod fingerprint;
pub mod identifiers;
pub mod layer;
pub mod time;
pub mod verdict;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::ConfigUpdate;
pub use config::DEFAULT_CONFIDENCE_THRESHOLD;
pub use config::DEFAULT_ESCALATION_THRESHOLD;
pub use config::DEFAULT_EVALUATION_TIMEOUT_MS;
pub use config::EngineConfig;
pub use evaluation::Escalation;
pub use evaluation::EscalationPriority;
pub use evaluation::Evaluation;
pub use evaluation::EvaluationMetadata;
pub use evaluation::WarmupOutcome;
pub use evaluation::WarmupStatus;
pub use events::EVALUATION_COMPLETED_TOPIC;
pub use events::EvaluationCompleted;
pub use events::EvaluationMetricEvent;
pub use events::EvaluationOutcome;
pub use evidence::EVIDENCE_KIND_LAYER_ERROR;
pub use evidence::Evidence;
pub use evidence::EvidenceFragment;
pub use evidence::RISK_EVIDENCE_KINDS;
pub use fingerprint::Fingerprint;
pub use fingerprint::FingerprintError;
pub use fingerprint::fingerprint;
pub use identifiers::ContentId;
pub use identifiers::CorrelationId;
pub use identifiers::EvaluationId;
pub use identifiers::LayerId;
pub use identifiers::RuleId;
pub use layer::CoherenceLayer;
pub use layer::LayerDescriptor;
pub use layer::LayerFailure;
pub use layer::LayerFailureKind;
pub use layer::LayerResult;
pub use layer::RetryPolicy;
pub use time::Timestamp;
pub use verdict::Verdict;
