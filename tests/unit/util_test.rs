//! Tests for utility functions

use std::time::Duration;
use unit_scheduler::util::clock::{as_millis_f64, now_ms};
use unit_scheduler::util::serde::duration_ms;
use unit_scheduler::util::telemetry::init_tracing;

#[derive(serde::Serialize, serde::Deserialize)]
struct Timed {
    #[serde(with = "duration_ms")]
    took: Duration,
}

#[test]
fn test_now_ms_is_positive() {
    assert!(now_ms() > 0);
}

#[test]
fn test_as_millis_f64() {
    assert!((as_millis_f64(Duration::from_micros(1500)) - 1.5).abs() < 1e-9);
    assert_eq!(as_millis_f64(Duration::ZERO), 0.0);
}

#[test]
fn test_duration_serialized_as_millis() {
    let json = serde_json::to_value(Timed {
        took: Duration::from_millis(250),
    })
    .unwrap();
    assert_eq!(json["took"], 250.0);

    let back: Timed = serde_json::from_str(r#"{"took": 1500.0}"#).unwrap();
    assert_eq!(back.took, Duration::from_millis(1500));
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
}
