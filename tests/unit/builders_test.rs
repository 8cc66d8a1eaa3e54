//! Tests for builder modules

use std::time::Duration;
use unit_scheduler::builders::{build_action_scheduler, build_scheduler, SchedulerBuilder};
use unit_scheduler::config::SchedulerConfig;
use unit_scheduler::core::{ActionExecutor, AuditAction, InMemoryAuditSink, SchedulerError, WorkItem};
use unit_scheduler::runtime::TokioSpawner;

#[tokio::test]
async fn test_build_scheduler_from_config() {
    let cfg = SchedulerConfig::default().with_max_concurrency(3);
    let scheduler = build_scheduler(&cfg, ActionExecutor::new(), TokioSpawner::current()).unwrap();
    assert_eq!(scheduler.max_concurrency(), 3);
    assert_eq!(scheduler.stats().max_concurrency, 3);
}

#[tokio::test]
async fn test_build_rejects_invalid_config() {
    let cfg = SchedulerConfig::default().with_max_concurrency(0);
    let err = build_scheduler(&cfg, ActionExecutor::new(), TokioSpawner::current())
        .err()
        .unwrap();
    assert!(matches!(err, SchedulerError::Config(_)));
}

#[tokio::test]
async fn test_build_action_scheduler_applies_default_timeout() {
    let cfg = SchedulerConfig::default()
        .with_max_concurrency(1)
        .with_default_timeout_secs(30);
    let scheduler = build_action_scheduler(&cfg, TokioSpawner::current()).unwrap();
    assert_eq!(scheduler.max_concurrency(), 1);
    assert_eq!(cfg.default_timeout(), Some(Duration::from_secs(30)));
}

#[tokio::test]
async fn test_builder_with_audit() {
    let audit = InMemoryAuditSink::new(16);
    let scheduler = SchedulerBuilder::new(
        SchedulerConfig::default(),
        ActionExecutor::new(),
        TokioSpawner::current(),
    )
    .max_concurrency(2)
    .with_audit(audit.clone())
    .build()
    .unwrap();

    scheduler
        .submit(WorkItem::compute("u1", "Unit 1", || async { Ok(serde_json::Value::Null) }))
        .unwrap();
    scheduler.drain().await;

    assert_eq!(scheduler.max_concurrency(), 2);
    assert_eq!(audit.unit_ids(AuditAction::Submit), ["u1"]);
    assert_eq!(audit.unit_ids(AuditAction::Dispatch), ["u1"]);
    assert_eq!(audit.unit_ids(AuditAction::Complete), ["u1"]);
}
