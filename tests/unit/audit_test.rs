//! Tests for audit sink

use unit_scheduler::core::{build_audit_event, AuditAction, AuditSink, InMemoryAuditSink};

#[test]
fn test_in_memory_audit_sink() {
    let sink = InMemoryAuditSink::new(10);

    let event = build_audit_event("unit1", "api", 3, AuditAction::Complete, Some("exit code: 1".to_string()));
    sink.record(event);
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].unit_id, "unit1");
    assert_eq!(events[0].category, "api");
    assert_eq!(events[0].priority, 3);
    assert_eq!(events[0].action, AuditAction::Complete);
    assert_eq!(events[0].detail.as_deref(), Some("exit code: 1"));
    assert!(events[0].created_at_ms > 0);
}

#[test]
fn test_audit_sink_overflow() {
    let sink = InMemoryAuditSink::new(2);

    sink.record(build_audit_event("u1", "general", 0, AuditAction::Submit, None));
    sink.record(build_audit_event("u2", "general", 0, AuditAction::Submit, None));
    sink.record(build_audit_event("u3", "general", 0, AuditAction::Dispatch, None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].unit_id, "u2"); // First one popped
    assert_eq!(events[1].unit_id, "u3");
    assert_eq!(sink.unit_ids(AuditAction::Submit), ["u2"]);
}

#[test]
fn test_zero_capacity_sink_keeps_nothing() {
    let sink = InMemoryAuditSink::new(0);
    sink.record(build_audit_event("u1", "general", 0, AuditAction::Submit, None));
    assert!(sink.events().is_empty());
}
