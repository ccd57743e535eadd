// system-tests/src/lib.rs
// ============================================================================
// Module: Coherence Engine System Tests Library
// Description: Shared handlers and collaborators for system test scenarios.
// Purpose: Provide common utilities for the system-test binaries.
// Dependencies: coherence-engine-core, serde_json
// ============================================================================

//! ## Overview
//! This crate hosts shared layer handlers and recording collaborators used
//! by the system-test binaries in `system-tests/tests`. Everything here
//! exercises the engine strictly through its public API.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod harness;
