//! Tests for error types

use unit_scheduler::core::{SchedulerError, UnitFailure};

#[test]
fn test_invalid_concurrency_error() {
    let err = SchedulerError::InvalidConcurrency(0);
    assert!(format!("{}", err).contains("0"));
}

#[test]
fn test_config_error() {
    let err = SchedulerError::Config("bad value".to_string());
    assert!(format!("{}", err).contains("bad value"));
}

#[test]
fn test_process_failure_messages() {
    let failure = UnitFailure::Process {
        exit_code: Some(2),
        detail: String::new(),
    };
    assert_eq!(format!("{}", failure), "exit code: 2");

    let failure = UnitFailure::Process {
        exit_code: Some(1),
        detail: "no such table".to_string(),
    };
    assert_eq!(format!("{}", failure), "exit code: 1: no such table");
}

#[test]
fn test_timeout_failure_message() {
    let failure = UnitFailure::Timeout { after_ms: 250 };
    assert_eq!(format!("{}", failure), "timed out after 250ms");
}

#[test]
fn test_failure_serializes_with_kind_tag() {
    let json = serde_json::to_value(UnitFailure::Action {
        message: "boom".to_string(),
    })
    .unwrap();
    assert_eq!(json["kind"], "action");
    assert_eq!(json["message"], "boom");
}
