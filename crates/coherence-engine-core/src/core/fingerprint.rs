// crates/coherence-engine-core/src/core/fingerprint.rs
// ============================================================================
// Module: Coherence Engine Fingerprinting
// Description: RFC 8785 canonical-JSON fingerprints for evaluation requests.
// Purpose: Provide deterministic cache keys and evaluation identifiers.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! An evaluation is memoizable by the pair `(cid, context)`. Both are folded
//! into one SHA-256 digest over RFC 8785 (JCS) canonical JSON, so key order
//! and whitespace in the caller-supplied context never produce distinct
//! cache keys. The caller-supplied request timestamp is deliberately
//! excluded: repeated requests must hit the same entry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

use crate::core::identifiers::ContentId;
use crate::core::identifiers::EvaluationId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of hex digits of the fingerprint folded into an evaluation id.
const EVALUATION_ID_DIGEST_LEN: usize = 16;

// ============================================================================
// SECTION: Fingerprint
// ============================================================================

/// Deterministic fingerprint of an evaluation request.
///
/// # Invariants
/// - `value` is a lowercase hex-encoded SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Returns the fingerprint as a lowercase hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derives the deterministic evaluation identifier for this fingerprint.
    #[must_use]
    pub fn evaluation_id(&self) -> EvaluationId {
        let prefix: String = self.0.chars().take(EVALUATION_ID_DIGEST_LEN).collect();
        EvaluationId::new(format!("eval-{prefix}"))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while computing fingerprints.
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize evaluation context: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Fingerprint Computation
// ============================================================================

/// Canonical key material hashed into a fingerprint.
#[derive(Serialize)]
struct KeyMaterial<'a> {
    /// Content identifier under evaluation.
    cid: &'a ContentId,
    /// Caller-supplied context value.
    context: &'a Value,
}

/// Computes the fingerprint for a `(cid, context)` pair.
///
/// # Errors
///
/// Returns [`FingerprintError::Canonicalization`] when the context cannot be
/// canonicalized (for example a non-string map key produced upstream).
pub fn fingerprint(cid: &ContentId, context: &Value) -> Result<Fingerprint, FingerprintError> {
    let material = KeyMaterial {
        cid,
        context,
    };
    let bytes = serde_jcs::to_vec(&material)
        .map_err(|err| FingerprintError::Canonicalization(err.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(Fingerprint(hex_encode(&hasher.finalize())))
}

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        // Writing into a String cannot fail.
        let _ = write!(out, "{byte:02x}");
    }
    out
}
