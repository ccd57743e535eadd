// crates/coherence-engine-core/src/runtime/registry.rs
// ============================================================================
// Module: Coherence Layer Registry
// Description: Ordered collection of registered coherence layers.
// Purpose: Hold layer capability records and produce the strict execution order.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The registry owns every registered [`CoherenceLayer`] and produces the
//! execution order consumed by the pipeline: priority ascending, ties broken
//! by registration order. Registration is idempotent per id (last write
//! wins) and replacement preserves the original registration position, so a
//! handler swap is observed on the next evaluation without reordering.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::identifiers::LayerId;
use crate::core::layer::CoherenceLayer;
use crate::core::layer::LayerDescriptor;

// ============================================================================
// SECTION: Layer Registry
// ============================================================================

/// Ordered collection of registered coherence layers.
///
/// # Invariants
/// - At most one layer per id.
/// - `ordered` returns a strict total order: `(priority asc, registration
///   order asc)`.
#[derive(Debug, Default)]
pub struct LayerRegistry {
    /// Registered layers in registration order.
    layers: Vec<CoherenceLayer>,
}

impl LayerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            layers: Vec::new(),
        }
    }

    /// Registers a layer, replacing any layer with the same id.
    ///
    /// Replacement keeps the original registration position so priority
    /// ties resolve identically before and after a handler swap.
    pub fn register(&mut self, layer: CoherenceLayer) {
        if let Some(existing) =
            self.layers.iter_mut().find(|entry| entry.layer_id == layer.layer_id)
        {
            *existing = layer;
        } else {
            self.layers.push(layer);
        }
    }

    /// Removes a layer by id, returning true when a layer was removed.
    pub fn unregister(&mut self, layer_id: &LayerId) -> bool {
        let before = self.layers.len();
        self.layers.retain(|entry| &entry.layer_id != layer_id);
        self.layers.len() != before
    }

    /// Returns the layers in execution order.
    ///
    /// The underlying storage is registration-ordered, so a stable sort by
    /// priority yields the tie-break contract for free.
    #[must_use]
    pub fn ordered(&self) -> Vec<CoherenceLayer> {
        let mut ordered = self.layers.clone();
        ordered.sort_by_key(|layer| layer.priority);
        ordered
    }

    /// Returns serializable descriptors in execution order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<LayerDescriptor> {
        self.ordered().iter().map(CoherenceLayer::descriptor).collect()
    }

    /// Returns the number of registered layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns true when no layers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
