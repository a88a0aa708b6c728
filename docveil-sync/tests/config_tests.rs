//! Configuration parsing and error classification.

use docveil_crypto::CryptoError;
use docveil_sync::{SyncConfig, SyncError};
use pretty_assertions::assert_eq;
use std::time::Duration;

// ── Config ──

#[test]
fn defaults_match_sync_timing() {
    let config = SyncConfig::default();
    assert_eq!(config.push_debounce(), Duration::from_millis(600));
    assert_eq!(config.poll_interval(), Duration::from_millis(2_500));
    assert_eq!(config.blob_name_prefix, "E2EE_Doc_");
    assert!(config.validate().is_ok());
}

#[test]
fn partial_json_fills_defaults() {
    let config = SyncConfig::from_json(r#"{"poll_interval_ms": 10000}"#).unwrap();
    assert_eq!(config.poll_interval_ms, 10_000);
    assert_eq!(config.push_debounce_ms, 600);
}

#[test]
fn zero_intervals_rejected() {
    let err = SyncConfig::from_json(r#"{"push_debounce_ms": 0}"#).unwrap_err();
    assert!(matches!(err, SyncError::Config(_)));

    let config = SyncConfig {
        poll_interval_ms: 0,
        ..SyncConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn prefix_with_slash_rejected() {
    let config = SyncConfig {
        blob_name_prefix: "a/b".into(),
        ..SyncConfig::default()
    };
    assert!(matches!(config.validate(), Err(SyncError::Config(_))));
}

#[test]
fn config_roundtrips_through_json() {
    let config = SyncConfig {
        push_debounce_ms: 250,
        ..SyncConfig::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(SyncConfig::from_json(&json).unwrap(), config);
}

// ── Errors ──

#[test]
fn authentication_failure_maps_to_integrity() {
    let err: SyncError = CryptoError::Authentication.into();
    assert!(err.is_integrity_failure());
    assert!(!err.is_recoverable());
}

#[test]
fn other_crypto_errors_stay_crypto() {
    let err: SyncError = CryptoError::InvalidFormat("bad iv".into()).into();
    assert!(matches!(err, SyncError::Crypto(_)));
}

#[test]
fn only_transport_and_auth_are_recoverable() {
    assert!(SyncError::Transport("timeout".into()).is_recoverable());
    assert!(SyncError::Unauthorized.is_recoverable());
    assert!(!SyncError::NotFound("x".into()).is_recoverable());
    assert!(!SyncError::MissingKeyringEntry("bob".into()).is_recoverable());
    assert!(!SyncError::SessionClosed.is_recoverable());
}

#[test]
fn error_messages() {
    assert_eq!(
        SyncError::MissingKeyringEntry("bob".into()).to_string(),
        "no keyring entry for member bob"
    );
    assert_eq!(
        SyncError::UnsupportedFormat(3).to_string(),
        "unsupported document format version 3"
    );
}
