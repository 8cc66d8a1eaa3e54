//! Tests for configuration validation

use std::collections::HashMap;
use unit_scheduler::config::{BatchManifest, SchedulerConfig, TargetEnv};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_scheduler_config_validation() {
    let valid = SchedulerConfig {
        max_concurrency: 4,
        default_timeout_secs: Some(60),
    };
    assert!(valid.validate().is_ok());
    assert!(SchedulerConfig::default().validate().is_ok());
}

#[test]
fn test_scheduler_config_invalid_concurrency() {
    let invalid = SchedulerConfig {
        max_concurrency: 0,
        default_timeout_secs: None,
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_invalid_timeout() {
    let invalid = SchedulerConfig::default().with_default_timeout_secs(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_from_json() {
    let cfg = SchedulerConfig::from_json_str(r#"{"max_concurrency": 8, "default_timeout_secs": 30}"#)
        .unwrap();
    assert_eq!(cfg.max_concurrency, 8);
    assert_eq!(cfg.default_timeout(), Some(std::time::Duration::from_secs(30)));

    let defaulted = SchedulerConfig::from_json_str("{}").unwrap();
    assert!(defaulted.max_concurrency >= 1);
    assert_eq!(defaulted.default_timeout_secs, None);

    assert!(SchedulerConfig::from_json_str(r#"{"max_concurrency": 0}"#).is_err());
    assert!(SchedulerConfig::from_json_str("not json").is_err());
}

#[test]
fn test_scheduler_config_from_lookup() {
    let cfg = SchedulerConfig::from_lookup(lookup(&[
        ("UNIT_SCHEDULER_MAX_CONCURRENCY", "3"),
        ("UNIT_SCHEDULER_TIMEOUT_SECS", "90"),
    ]))
    .unwrap();
    assert_eq!(cfg.max_concurrency, 3);
    assert_eq!(cfg.default_timeout_secs, Some(90));

    let err = SchedulerConfig::from_lookup(lookup(&[("UNIT_SCHEDULER_MAX_CONCURRENCY", "lots")]))
        .unwrap_err();
    assert!(err.contains("UNIT_SCHEDULER_MAX_CONCURRENCY"));
    assert!(SchedulerConfig::from_lookup(lookup(&[("UNIT_SCHEDULER_MAX_CONCURRENCY", "0")])).is_err());
}

#[test]
fn test_target_env_defaults() {
    let target = TargetEnv::from_lookup(lookup(&[])).unwrap();
    assert_eq!(target, TargetEnv::default());
    assert_eq!(target.api_url(), "http://localhost:5000");
    assert_eq!(target.frontend_url(), "http://localhost:3000");
}

#[test]
fn test_target_env_overrides() {
    let target = TargetEnv::from_lookup(lookup(&[
        ("BACKEND_HOST", "backend"),
        ("BACKEND_PORT", "8000"),
        ("FRONTEND_HOST", ""),
    ]))
    .unwrap();
    let vars = target.overrides();
    assert_eq!(vars["BACKEND_HOST"], "backend");
    assert_eq!(vars["FRONTEND_HOST"], "localhost");
    assert_eq!(vars["API_URL"], "http://backend:8000");
    assert_eq!(vars["FRONTEND_URL"], "http://localhost:3000");

    assert!(TargetEnv::from_lookup(lookup(&[("BACKEND_PORT", "99999")])).is_err());
}

#[test]
fn test_manifest_defaults_and_items() {
    let manifest = BatchManifest::from_json_str(
        r#"{
            "scheduler": {"max_concurrency": 2},
            "units": [
                {"id": "a", "name": "A", "program": "true", "priority": 3, "timeout_secs": 5},
                {"name": "B", "program": "false", "category": "db"}
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(manifest.scheduler.as_ref().unwrap().max_concurrency, 2);
    assert_eq!(manifest.units[1].category, "db");

    let items = manifest.work_items(&TargetEnv::default());
    assert_eq!(items[0].id(), "a");
    assert_eq!(items[0].priority(), 3);
    assert_eq!(items[0].meta().category, "general");
    assert!(!items[1].id().is_empty());
    assert_eq!(items[1].meta().category, "db");
}

#[test]
fn test_manifest_validation_errors() {
    let duplicate = r#"{"units": [
        {"id": "x", "name": "X", "program": "true"},
        {"id": "x", "name": "Y", "program": "true"}
    ]}"#;
    assert!(BatchManifest::from_json_str(duplicate).unwrap_err().contains("duplicate"));

    let blank = r#"{"units": [{"name": "X", "program": " "}]}"#;
    assert!(BatchManifest::from_json_str(blank).is_err());

    let zero_timeout = r#"{"units": [{"name": "X", "program": "true", "timeout_secs": 0}]}"#;
    assert!(BatchManifest::from_json_str(zero_timeout).is_err());
}
