// crates/coherence-engine-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payloads.
// Purpose: Deterministic examples for docs and tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical examples for coherence engine configuration. Outputs are
//! deterministic and kept in sync with the configuration model; the example
//! must always load and validate.

/// Returns a canonical example `coherence-engine.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[engine]
confidence_threshold = 0.7
escalation_threshold = 0.5
evaluation_timeout_ms = 30000

[cache]
# Unbounded when omitted; eviction is explicit reset only.
max_entries = 100000

[layers]
max_timeout_ms = 30000
max_retries = 5
"#,
    )
}
