// crates/coherence-engine-core/src/runtime/cache.rs
// ============================================================================
// Module: Coherence Result Cache
// Description: In-memory fingerprint-keyed evaluation cache.
// Purpose: Memoize evaluations for fast repeat lookups and deterministic replay.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The in-memory cache is the reference [`EvaluationCache`] implementation:
//! an `Arc<Mutex<BTreeMap>>` keyed by fingerprint hex. Entries are
//! snapshots, never mutated; eviction is explicit reset only, with an
//! optional hard entry bound for deployments that must cap memory. The
//! entry's insertion time is the cached evaluation's own request timestamp.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::evaluation::Evaluation;
use crate::core::fingerprint::Fingerprint;
use crate::interfaces::CacheError;
use crate::interfaces::EvaluationCache;

// ============================================================================
// SECTION: In-Memory Cache
// ============================================================================

/// In-memory evaluation cache.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEvaluationCache {
    /// Evaluation snapshots keyed by fingerprint hex, behind a mutex.
    entries: Arc<Mutex<BTreeMap<String, Evaluation>>>,
    /// Optional hard bound on the number of entries.
    max_entries: Option<usize>,
}

impl InMemoryEvaluationCache {
    /// Creates an unbounded cache.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(None)
    }

    /// Creates a cache with an optional hard entry bound.
    #[must_use]
    pub fn with_limits(max_entries: Option<usize>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(BTreeMap::new())),
            max_entries,
        }
    }
}

impl EvaluationCache for InMemoryEvaluationCache {
    fn get(&self, fingerprint: &Fingerprint) -> Result<Option<Evaluation>, CacheError> {
        let guard = self
            .entries
            .lock()
            .map_err(|_| CacheError::Store("evaluation cache mutex poisoned".to_string()))?;
        Ok(guard.get(fingerprint.as_str()).cloned())
    }

    fn put(&self, fingerprint: Fingerprint, evaluation: Evaluation) -> Result<(), CacheError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| CacheError::Store("evaluation cache mutex poisoned".to_string()))?;
        if let Some(capacity) = self.max_entries
            && guard.len() >= capacity
            && !guard.contains_key(fingerprint.as_str())
        {
            return Err(CacheError::Full {
                capacity,
            });
        }
        guard.insert(fingerprint.as_str().to_string(), evaluation);
        Ok(())
    }

    fn reset(&self) -> Result<(), CacheError> {
        self.entries
            .lock()
            .map_err(|_| CacheError::Store("evaluation cache mutex poisoned".to_string()))?
            .clear();
        Ok(())
    }

    fn len(&self) -> Result<usize, CacheError> {
        let guard = self
            .entries
            .lock()
            .map_err(|_| CacheError::Store("evaluation cache mutex poisoned".to_string()))?;
        Ok(guard.len())
    }
}

// ============================================================================
// SECTION: Shared Cache Wrapper
// ============================================================================

/// Shared evaluation cache backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedEvaluationCache {
    /// Inner cache implementation.
    inner: Arc<dyn EvaluationCache + Send + Sync>,
}

impl SharedEvaluationCache {
    /// Wraps an evaluation cache in a shared, clonable wrapper.
    #[must_use]
    pub fn from_cache(cache: impl EvaluationCache + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(cache),
        }
    }

    /// Wraps an existing shared cache.
    #[must_use]
    pub const fn new(cache: Arc<dyn EvaluationCache + Send + Sync>) -> Self {
        Self {
            inner: cache,
        }
    }
}

impl EvaluationCache for SharedEvaluationCache {
    fn get(&self, fingerprint: &Fingerprint) -> Result<Option<Evaluation>, CacheError> {
        self.inner.get(fingerprint)
    }

    fn put(&self, fingerprint: Fingerprint, evaluation: Evaluation) -> Result<(), CacheError> {
        self.inner.put(fingerprint, evaluation)
    }

    fn reset(&self) -> Result<(), CacheError> {
        self.inner.reset()
    }

    fn len(&self) -> Result<usize, CacheError> {
        self.inner.len()
    }
}
