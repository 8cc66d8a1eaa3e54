//! Tests for tokio spawner and API helpers

use std::time::Duration;
use unit_scheduler::core::{ActionExecutor, Scheduler, Spawn, WorkItem};
use unit_scheduler::runtime::api::{health, snapshot};
use unit_scheduler::runtime::tokio_spawner::TokioSpawner;

fn slow_unit(id: &str, work: Duration) -> WorkItem {
    WorkItem::compute(id, format!("unit {id}"), move || async move {
        tokio::time::sleep(work).await;
        Ok(serde_json::Value::Null)
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(async move {
        tx.send(123).unwrap();
    });

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[test]
fn test_worker_thread_spawner() {
    let (spawner, _runtime) = TokioSpawner::with_worker_threads(2).unwrap();
    let (tx, rx) = std::sync::mpsc::channel();
    spawner.spawn(async move {
        tx.send("done").unwrap();
    });
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "done");
}

#[test]
fn test_dropping_scheduler_with_running_unit() {
    let (spawner, runtime) = TokioSpawner::with_worker_threads(2).unwrap();
    let scheduler = Scheduler::new(1, ActionExecutor::new(), spawner).unwrap();
    let handle = scheduler
        .submit(slow_unit("slow", Duration::from_millis(200)))
        .unwrap();
    drop(scheduler);

    let result = runtime.block_on(handle.wait()).unwrap();
    assert!(result.success);
}

#[tokio::test]
async fn test_dropping_drained_scheduler_in_async_context() {
    let (spawner, runtime) = TokioSpawner::with_worker_threads(1).unwrap();
    let scheduler = Scheduler::new(2, ActionExecutor::new(), spawner).unwrap();
    scheduler
        .submit(slow_unit("quick", Duration::from_millis(10)))
        .unwrap();
    assert_eq!(scheduler.drain().await.len(), 1);

    drop(scheduler);
    runtime.shutdown_background();
}

#[test]
fn test_runtime_shutdown_still_resolves_running_unit() {
    let (spawner, runtime) = TokioSpawner::with_worker_threads(1).unwrap();
    let scheduler = Scheduler::new(1, ActionExecutor::new(), spawner).unwrap();
    let handle = scheduler
        .submit(slow_unit("stuck", Duration::from_secs(30)))
        .unwrap();

    runtime.shutdown_background();

    let result = futures::executor::block_on(handle.wait()).unwrap();
    assert!(!result.success);
    assert!(result.error_message().unwrap().contains("dropped"));
    assert_eq!(scheduler.stats().active, 0);
    assert_eq!(futures::executor::block_on(scheduler.drain()).len(), 1);
}

#[tokio::test]
async fn test_snapshot_reflects_stats() {
    let scheduler = Scheduler::new(2, ActionExecutor::new(), TokioSpawner::current()).unwrap();
    let idle = snapshot(&scheduler);
    assert!(!idle.busy);
    assert_eq!(idle.stats.max_concurrency, 2);

    scheduler
        .submit(WorkItem::compute("u1", "Unit 1", || async { Ok(serde_json::Value::Null) }))
        .unwrap();
    // Not yet polled on the current-thread runtime.
    assert!(snapshot(&scheduler).busy);
    scheduler.drain().await;

    let done = snapshot(&scheduler);
    assert!(!done.busy);
    assert_eq!(done.stats.completed, 1);
    assert!(serde_json::to_value(&done).unwrap()["stats"]["completed"] == 1);
}

#[test]
fn test_health() {
    assert!(health().ok);
}
