// crates/coherence-engine-core/src/runtime/builtin.rs
// ============================================================================
// Module: Built-In Coherence Layers
// Description: Identity and permission judgment layers shipped with the engine.
// Purpose: Provide ready-made layers for demos, tests, and baseline policies.
// Dependencies: crate::{core, interfaces}, serde_json
// ============================================================================

//! ## Overview
//! Two layers ship with the engine. `Identity Verification` warns when the
//! caller context carries no verified identity; `Permission Validation`
//! denies when the context grants no permissions. Both read well-known
//! context fields and treat absence as the unsafe case, failing closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use serde_json::json;

use crate::core::evidence::EvidenceFragment;
use crate::core::identifiers::ContentId;
use crate::core::identifiers::LayerId;
use crate::core::layer::CoherenceLayer;
use crate::core::verdict::Verdict;
use crate::interfaces::HandlerError;
use crate::interfaces::LayerHandler;
use crate::interfaces::LayerJudgment;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Identifier of the identity verification layer.
pub const IDENTITY_VERIFICATION_LAYER_ID: &str = "identity-verification";
/// Identifier of the permission validation layer.
pub const PERMISSION_VALIDATION_LAYER_ID: &str = "permission-validation";

/// Confidence of a verified-identity Allow.
const IDENTITY_ALLOW_CONFIDENCE: f64 = 0.9;
/// Confidence of an unverified-identity Warn.
const IDENTITY_WARN_CONFIDENCE: f64 = 0.7;
/// Confidence of a granted-permissions Allow.
const PERMISSION_ALLOW_CONFIDENCE: f64 = 0.85;
/// Confidence of an empty-permissions Deny.
const PERMISSION_DENY_CONFIDENCE: f64 = 0.9;
/// Risk score attached to an empty-permissions Deny.
const PERMISSION_DENY_RISK_SCORE: f64 = 0.8;

// ============================================================================
// SECTION: Identity Verification
// ============================================================================

/// Warns when the context carries no verified identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityVerificationLayer;

impl LayerHandler for IdentityVerificationLayer {
    fn judge(&self, _cid: &ContentId, context: &Value) -> Result<LayerJudgment, HandlerError> {
        let verified = context
            .get("identity")
            .and_then(|identity| identity.get("verified"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let (verdict, confidence) = if verified {
            (Verdict::Allow, IDENTITY_ALLOW_CONFIDENCE)
        } else {
            (Verdict::Warn, IDENTITY_WARN_CONFIDENCE)
        };
        Ok(LayerJudgment {
            verdict,
            confidence,
            evidence: vec![EvidenceFragment::new(
                "identity-status",
                json!({ "verified": verified }),
            )],
        })
    }
}

/// Builds the identity verification layer at its default priority.
#[must_use]
pub fn identity_verification_layer() -> CoherenceLayer {
    CoherenceLayer::new(
        LayerId::new(IDENTITY_VERIFICATION_LAYER_ID),
        "Identity Verification",
        1,
        Arc::new(IdentityVerificationLayer),
    )
}

// ============================================================================
// SECTION: Permission Validation
// ============================================================================

/// Denies when the context grants no permissions.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionValidationLayer;

impl LayerHandler for PermissionValidationLayer {
    fn judge(&self, _cid: &ContentId, context: &Value) -> Result<LayerJudgment, HandlerError> {
        let granted = context
            .get("permissions")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        if granted == 0 {
            return Ok(LayerJudgment {
                verdict: Verdict::Deny,
                confidence: PERMISSION_DENY_CONFIDENCE,
                evidence: vec![EvidenceFragment::new(
                    "content-risk",
                    json!({ "score": PERMISSION_DENY_RISK_SCORE, "reason": "no permissions granted" }),
                )],
            });
        }
        Ok(LayerJudgment {
            verdict: Verdict::Allow,
            confidence: PERMISSION_ALLOW_CONFIDENCE,
            evidence: vec![EvidenceFragment::new(
                "permission-status",
                json!({ "granted": granted }),
            )],
        })
    }
}

/// Builds the permission validation layer at its default priority.
#[must_use]
pub fn permission_validation_layer() -> CoherenceLayer {
    CoherenceLayer::new(
        LayerId::new(PERMISSION_VALIDATION_LAYER_ID),
        "Permission Validation",
        2,
        Arc::new(PermissionValidationLayer),
    )
}
