// crates/coherence-engine-core/tests/config.rs
// ============================================================================
// Module: Engine Configuration Tests
// Description: Validation and partial-merge semantics for engine config.
// ============================================================================
//! ## Overview
//! Validates threshold bounds, deadline bounds, and the all-or-nothing
//! behavior of partial configuration merges.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use coherence_engine_core::ConfigError;
use coherence_engine_core::ConfigUpdate;
use coherence_engine_core::EngineConfig;

#[test]
fn default_config_is_valid() {
    assert!(EngineConfig::default().validate().is_ok());
}

#[test]
fn thresholds_outside_unit_interval_are_rejected() {
    let config = EngineConfig {
        confidence_threshold: 1.5,
        ..EngineConfig::default()
    };
    assert!(matches!(
        config.validate().unwrap_err(),
        ConfigError::ThresholdOutOfRange {
            field: "confidence_threshold",
            ..
        }
    ));

    let config = EngineConfig {
        escalation_threshold: -0.1,
        ..EngineConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn non_finite_thresholds_are_rejected() {
    let config = EngineConfig {
        confidence_threshold: f64::NAN,
        ..EngineConfig::default()
    };
    assert!(config.validate().is_err());

    let config = EngineConfig {
        escalation_threshold: f64::INFINITY,
        ..EngineConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn zero_evaluation_timeout_is_rejected() {
    let config = EngineConfig {
        evaluation_timeout_ms: 0,
        ..EngineConfig::default()
    };
    assert!(matches!(config.validate().unwrap_err(), ConfigError::TimeoutOutOfRange(0)));
}

#[test]
fn merged_updates_only_the_supplied_fields() {
    let base = EngineConfig::default();
    let merged = base
        .merged(&ConfigUpdate {
            escalation_threshold: Some(0.4),
            ..ConfigUpdate::default()
        })
        .unwrap();

    assert!((merged.escalation_threshold - 0.4).abs() < f64::EPSILON);
    assert!((merged.confidence_threshold - base.confidence_threshold).abs() < f64::EPSILON);
    assert_eq!(merged.evaluation_timeout_ms, base.evaluation_timeout_ms);
}

#[test]
fn invalid_merge_returns_error_without_partial_effect() {
    let base = EngineConfig::default();
    let err = base
        .merged(&ConfigUpdate {
            confidence_threshold: Some(0.9),
            evaluation_timeout_ms: Some(0),
            ..ConfigUpdate::default()
        })
        .unwrap_err();
    assert!(matches!(err, ConfigError::TimeoutOutOfRange(0)));
}

#[test]
fn empty_update_is_a_no_op() {
    let base = EngineConfig::default();
    let merged = base.merged(&ConfigUpdate::default()).unwrap();
    assert_eq!(merged, base);
}
