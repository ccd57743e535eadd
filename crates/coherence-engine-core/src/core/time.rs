// crates/coherence-engine-core/src/core/time.rs
// ============================================================================
// Module: Coherence Engine Time Model
// Description: Canonical timestamp representations for evaluations and events.
// Purpose: Keep cached decision content deterministic and replayable.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Decision content embeds explicit time values supplied by callers; the
//! engine never stamps records from the wall clock. Wall-clock readings are
//! confined to measured durations and timeout enforcement inside the layer
//! executor, so a cached evaluation replays byte-identical.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp used in evaluation records, evidence, and events.
///
/// # Invariants
/// - Values are explicitly provided by callers; the engine never reads
///   wall-clock time for record content.
/// - No validation is performed; monotonicity is a caller responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Timestamp {
    /// Unix epoch milliseconds.
    UnixMillis(i64),
    /// Monotonic logical time value.
    Logical(u64),
}

impl Timestamp {
    /// Returns the timestamp as unix milliseconds when available.
    #[must_use]
    pub const fn as_unix_millis(&self) -> Option<i64> {
        match self {
            Self::UnixMillis(value) => Some(*value),
            Self::Logical(_) => None,
        }
    }

    /// Returns the timestamp as logical time when available.
    #[must_use]
    pub const fn as_logical(&self) -> Option<u64> {
        match self {
            Self::UnixMillis(_) => None,
            Self::Logical(value) => Some(*value),
        }
    }

    /// Returns a timestamp offset forward by the given milliseconds.
    ///
    /// Saturates instead of wrapping so replayed batches near the numeric
    /// bounds stay ordered.
    #[must_use]
    pub fn offset_ms(self, delta_ms: u64) -> Self {
        match self {
            Self::UnixMillis(value) => {
                let delta = i64::try_from(delta_ms).unwrap_or(i64::MAX);
                Self::UnixMillis(value.saturating_add(delta))
            }
            Self::Logical(value) => Self::Logical(value.saturating_add(delta_ms)),
        }
    }
}
