//! Bounded-concurrency, priority-ordered scheduler.
//!
//! Pending units wait in a priority queue. Whenever fewer than `max_concurrency`
//! units are running, the highest-priority pending unit (earliest submission among
//! equals) is dispatched to the executor on the configured [`Spawn`] runtime. Each
//! completion frees a slot and triggers another dispatch step, until the queue is
//! empty and nothing is running.
//!
//! All scheduler state (`pending`, `active`, collected results, counters) lives
//! behind a single `parking_lot::Mutex` that is never held across an `.await`.
//! Completion is published through a `tokio::sync::watch` channel carrying the
//! number of outstanding units, which is what [`Scheduler::drain`] waits on.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::core::audit::{build_audit_event, AuditAction, AuditEvent, AuditSink};
use crate::core::{RunResult, SchedulerError, UnitExecutor, UnitFailure, UnitMeta, WorkItem};
use crate::infra::queue::{InMemoryQueue, QueuedUnit};
use crate::util::serde::UnitId;

/// Abstraction for spawning unit execution on a runtime.
pub trait Spawn: Send + Sync + 'static {
    /// Spawn a future that runs to completion in the background.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Snapshot of scheduler counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Configured concurrency ceiling.
    pub max_concurrency: usize,
    /// Units accepted since construction.
    pub submitted: u64,
    /// Units moved from pending to running.
    pub dispatched: u64,
    /// Units whose result has been recorded.
    pub completed: u64,
    /// Completed units that failed.
    pub failed: u64,
    /// Units running right now.
    pub active: usize,
    /// Units waiting for a slot.
    pub pending: usize,
    /// Highest number of simultaneously running units observed.
    pub peak_active: usize,
}

/// Resolves to the result of one submitted unit.
#[derive(Debug)]
pub struct RunHandle {
    id: UnitId,
    rx: oneshot::Receiver<RunResult>,
}

impl RunHandle {
    /// Identifier of the unit this handle belongs to.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the unit's result.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::HandleDropped`] if the result could not be
    /// delivered. A unit whose execution the runtime drops (e.g. during runtime
    /// shutdown) still resolves, with a failed result.
    pub async fn wait(self) -> Result<RunResult, SchedulerError> {
        self.rx
            .await
            .map_err(|_| SchedulerError::HandleDropped(self.id))
    }
}

struct Pending {
    item: WorkItem,
    responder: oneshot::Sender<RunResult>,
}

struct SchedulerState {
    queue: InMemoryQueue<Pending>,
    next_seq: u64,
    active: usize,
    completed: Vec<RunResult>,
    stats: SchedulerStats,
    // Events decided under the lock, handed to the sink after it is released.
    audit_backlog: Vec<AuditEvent>,
}

impl SchedulerState {
    fn outstanding(&self) -> usize {
        self.queue.len() + self.active
    }
}

struct Shared<E, S> {
    max_concurrency: usize,
    state: Mutex<SchedulerState>,
    outstanding: watch::Sender<usize>,
    executor: E,
    spawner: S,
    audit: Option<Arc<dyn AuditSink>>,
    audit_flush: Mutex<()>,
}

impl<E, S> Shared<E, S> {
    fn audit(
        &self,
        state: &mut SchedulerState,
        meta: &UnitMeta,
        action: AuditAction,
        detail: Option<String>,
    ) {
        if self.audit.is_some() {
            state.audit_backlog.push(build_audit_event(
                meta.id.clone(),
                meta.category.clone(),
                meta.priority,
                action,
                detail,
            ));
        }
    }

    /// Hand buffered events to the sink in the order they were decided.
    ///
    /// Must be called without the state lock held. Only one caller flushes at a
    /// time. Unless `wait` is set, a concurrent (or reentrant) caller leaves its
    /// events to the current flusher.
    fn flush_audit(&self, wait: bool) {
        let Some(sink) = &self.audit else {
            return;
        };
        loop {
            let guard = if wait {
                self.audit_flush.lock()
            } else {
                match self.audit_flush.try_lock() {
                    Some(guard) => guard,
                    None => return,
                }
            };
            loop {
                let events = std::mem::take(&mut self.state.lock().audit_backlog);
                if events.is_empty() {
                    break;
                }
                for event in events {
                    sink.record(event);
                }
            }
            drop(guard);
            // Events pushed between the last take and the release would be stranded.
            if self.state.lock().audit_backlog.is_empty() {
                return;
            }
        }
    }
}

/// Priority-aware scheduler with a fixed concurrency ceiling.
///
/// Cloning yields another handle to the same scheduler.
///
/// # Example
///
/// ```rust,ignore
/// use unit_scheduler::core::{ActionExecutor, Scheduler, WorkItem};
/// use unit_scheduler::runtime::TokioSpawner;
///
/// let scheduler = Scheduler::new(4, ActionExecutor::new(), TokioSpawner::current())?;
/// let handle = scheduler.submit(
///     WorkItem::compute("ping", "Ping", || async { Ok(serde_json::json!("pong")) })
///         .with_priority(10),
/// )?;
/// let result = handle.wait().await?;
/// let all = scheduler.drain().await;
/// ```
pub struct Scheduler<E, S> {
    shared: Arc<Shared<E, S>>,
}

impl<E, S> Clone for Scheduler<E, S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E, S> Scheduler<E, S>
where
    E: UnitExecutor,
    S: Spawn,
{
    /// Create a scheduler running at most `max_concurrency` units at once.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConcurrency`] when `max_concurrency` is 0.
    pub fn new(max_concurrency: usize, executor: E, spawner: S) -> Result<Self, SchedulerError> {
        Self::from_parts(max_concurrency, executor, spawner, None)
    }

    pub(crate) fn from_parts(
        max_concurrency: usize,
        executor: E,
        spawner: S,
        audit: Option<Arc<dyn AuditSink>>,
    ) -> Result<Self, SchedulerError> {
        if max_concurrency == 0 {
            return Err(SchedulerError::InvalidConcurrency(max_concurrency));
        }
        let (outstanding, _) = watch::channel(0);
        info!(max_concurrency, "scheduler created");
        Ok(Self {
            shared: Arc::new(Shared {
                max_concurrency,
                state: Mutex::new(SchedulerState {
                    queue: InMemoryQueue::new(),
                    next_seq: 0,
                    active: 0,
                    completed: Vec::new(),
                    stats: SchedulerStats {
                        max_concurrency,
                        ..SchedulerStats::default()
                    },
                    audit_backlog: Vec::new(),
                }),
                outstanding,
                executor,
                spawner,
                audit,
                audit_flush: Mutex::new(()),
            }),
        })
    }

    /// Configured concurrency ceiling.
    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.shared.max_concurrency
    }

    /// Enqueue one unit and dispatch it if a slot is free.
    ///
    /// Never blocks. Priority is evaluated against units pending at dispatch time:
    /// a unit submitted while a slot is free starts immediately, and running units
    /// are never preempted.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidWorkItem`] if the item is malformed; the
    /// item is not enqueued in that case.
    pub fn submit(&self, item: WorkItem) -> Result<RunHandle, SchedulerError> {
        item.validate()?;
        let handle = {
            let mut state = self.shared.state.lock();
            let handle = self.enqueue_locked(&mut state, item);
            self.shared.outstanding.send_replace(state.outstanding());
            handle
        };
        Self::dispatch(&self.shared);
        Ok(handle)
    }

    /// Enqueue a group of units atomically, then dispatch.
    ///
    /// Every item is validated before any is enqueued, and the whole group enters
    /// the queue under one lock, so priority ordering applies across the group.
    ///
    /// # Errors
    ///
    /// Returns the first validation error; nothing is enqueued in that case.
    pub fn submit_all(
        &self,
        items: impl IntoIterator<Item = WorkItem>,
    ) -> Result<Vec<RunHandle>, SchedulerError> {
        let items: Vec<WorkItem> = items.into_iter().collect();
        for item in &items {
            item.validate()?;
        }
        let handles = {
            let mut state = self.shared.state.lock();
            let handles: Vec<RunHandle> = items
                .into_iter()
                .map(|item| self.enqueue_locked(&mut state, item))
                .collect();
            self.shared.outstanding.send_replace(state.outstanding());
            handles
        };
        Self::dispatch(&self.shared);
        Ok(handles)
    }

    /// Wait until nothing is pending or running, then return the results
    /// collected since the previous drain, in completion order.
    ///
    /// Every audit event for those units has been recorded when this returns.
    pub async fn drain(&self) -> Vec<RunResult> {
        let mut rx = self.shared.outstanding.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here.
        let _ = rx.wait_for(|outstanding| *outstanding == 0).await;
        self.shared.flush_audit(true);
        let results = std::mem::take(&mut self.shared.state.lock().completed);
        debug!(results = results.len(), "scheduler drained");
        results
    }

    /// Snapshot of the scheduler's counters.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        let state = self.shared.state.lock();
        SchedulerStats {
            active: state.active,
            pending: state.queue.len(),
            ..state.stats.clone()
        }
    }

    fn enqueue_locked(&self, state: &mut SchedulerState, item: WorkItem) -> RunHandle {
        let (responder, rx) = oneshot::channel();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.stats.submitted += 1;
        self.shared.audit(state, item.meta(), AuditAction::Submit, None);
        debug!(unit_id = %item.id(), priority = item.priority(), seq, "unit enqueued");
        let handle = RunHandle {
            id: item.id().to_string(),
            rx,
        };
        state.queue.push(QueuedUnit {
            priority: item.priority(),
            seq,
            payload: Pending { item, responder },
        });
        handle
    }

    /// Start pending units while slots are free.
    fn dispatch(shared: &Arc<Shared<E, S>>) {
        let ready = {
            let mut state = shared.state.lock();
            let mut ready = Vec::new();
            while state.active < shared.max_concurrency {
                let Some(unit) = state.queue.pop() else {
                    break;
                };
                state.active += 1;
                state.stats.dispatched += 1;
                state.stats.peak_active = state.stats.peak_active.max(state.active);
                shared.audit(&mut state, unit.payload.item.meta(), AuditAction::Dispatch, None);
                debug!(
                    unit_id = %unit.payload.item.id(),
                    priority = unit.priority,
                    active = state.active,
                    "unit dispatched"
                );
                ready.push(unit.payload);
            }
            ready
        };

        shared.flush_audit(false);
        for pending in ready {
            Self::spawn_unit(shared, pending);
        }
    }

    fn spawn_unit(shared: &Arc<Shared<E, S>>, pending: Pending) {
        let Pending { item, responder } = pending;
        let mut slot = SlotGuard {
            shared: Arc::clone(shared),
            meta: item.meta().clone(),
            started: Instant::now(),
            responder: Some(responder),
        };
        shared.spawner.spawn(async move {
            let result = match AssertUnwindSafe(slot.shared.executor.execute(item))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(unit_id = %slot.meta.id, panic = %message, "executor panicked");
                    RunResult::failed(
                        slot.meta.clone(),
                        slot.started.elapsed(),
                        UnitFailure::Action {
                            message: format!("panicked: {message}"),
                        },
                    )
                }
            };
            slot.finish(result);
        });
    }

    /// Release the slot, record the result, dispatch again, then resolve the handle.
    fn on_finished(
        shared: &Arc<Shared<E, S>>,
        result: RunResult,
        responder: oneshot::Sender<RunResult>,
    ) {
        {
            let mut state = shared.state.lock();
            state.active -= 1;
            state.stats.completed += 1;
            if !result.success {
                state.stats.failed += 1;
            }
            if shared.audit.is_some() {
                state.audit_backlog.push(build_audit_event(
                    result.id.clone(),
                    result.category.clone(),
                    result.priority,
                    AuditAction::Complete,
                    result.error_message(),
                ));
            }
            state.completed.push(result.clone());
            shared.outstanding.send_replace(state.outstanding());
        }

        Self::dispatch(shared);

        if responder.send(result).is_err() {
            debug!("run handle dropped before completion");
        }
    }
}

/// Holds a running unit's slot. If the unit's future is dropped before it
/// finishes (runtime shutdown), the slot is released with a failed result.
struct SlotGuard<E, S>
where
    E: UnitExecutor,
    S: Spawn,
{
    shared: Arc<Shared<E, S>>,
    meta: UnitMeta,
    started: Instant,
    responder: Option<oneshot::Sender<RunResult>>,
}

impl<E, S> SlotGuard<E, S>
where
    E: UnitExecutor,
    S: Spawn,
{
    fn finish(&mut self, result: RunResult) {
        if let Some(responder) = self.responder.take() {
            Scheduler::<E, S>::on_finished(&self.shared, result, responder);
        }
    }
}

impl<E, S> Drop for SlotGuard<E, S>
where
    E: UnitExecutor,
    S: Spawn,
{
    fn drop(&mut self) {
        if self.responder.is_some() {
            warn!(unit_id = %self.meta.id, "unit dropped before completion");
            let result = RunResult::failed(
                self.meta.clone(),
                self.started.elapsed(),
                UnitFailure::Action {
                    message: "dropped before completion".to_string(),
                },
            );
            self.finish(result);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ActionExecutor;
    use crate::runtime::TokioSpawner;

    #[tokio::test]
    async fn test_zero_concurrency_rejected() {
        let err = Scheduler::new(0, ActionExecutor::new(), TokioSpawner::current())
            .err()
            .unwrap();
        assert!(matches!(err, SchedulerError::InvalidConcurrency(0)));
    }

    #[tokio::test]
    async fn test_drain_on_empty_scheduler() {
        let scheduler = Scheduler::new(2, ActionExecutor::new(), TokioSpawner::current()).unwrap();
        assert!(scheduler.drain().await.is_empty());
        assert_eq!(scheduler.stats().submitted, 0);
    }

    #[tokio::test]
    async fn test_handle_resolves_with_result() {
        let scheduler = Scheduler::new(1, ActionExecutor::new(), TokioSpawner::current()).unwrap();
        let handle = scheduler
            .submit(WorkItem::compute("one", "One", || async { Ok(serde_json::json!(1)) }))
            .unwrap();
        assert_eq!(handle.id(), "one");
        let result = handle.wait().await.unwrap();
        assert!(result.success);
        assert_eq!(result.value, Some(serde_json::json!(1)));

        let drained = scheduler.drain().await;
        assert_eq!(drained, vec![result]);
        assert!(scheduler.drain().await.is_empty());
    }

    #[tokio::test]
    async fn test_panicking_action_is_recorded() {
        let scheduler = Scheduler::new(2, ActionExecutor::new(), TokioSpawner::current()).unwrap();
        scheduler
            .submit(WorkItem::compute("boom", "Boom", || async {
                if true {
                    panic!("kaboom");
                }
                Ok(serde_json::Value::Null)
            }))
            .unwrap();
        scheduler
            .submit(WorkItem::compute("fine", "Fine", || async { Ok(serde_json::Value::Null) }))
            .unwrap();

        let results = scheduler.drain().await;
        assert_eq!(results.len(), 2);
        let boom = results.iter().find(|r| r.id == "boom").unwrap();
        assert!(!boom.success);
        assert!(boom.error_message().unwrap().contains("kaboom"));
        assert_eq!(scheduler.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_invalid_item_rejected_synchronously() {
        let scheduler = Scheduler::new(2, ActionExecutor::new(), TokioSpawner::current()).unwrap();
        let ok = WorkItem::compute("ok", "Ok", || async { Ok(serde_json::Value::Null) });
        let bad = WorkItem::compute("", "Nameless id", || async { Ok(serde_json::Value::Null) });

        let err = scheduler.submit_all(vec![ok, bad]).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidWorkItem { .. }));
        assert_eq!(scheduler.stats().submitted, 0);
        assert!(scheduler.drain().await.is_empty());
    }
}
