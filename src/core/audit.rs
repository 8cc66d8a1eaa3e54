//! Audit trail of unit lifecycle transitions.
//!
//! The scheduler records one event per transition (submit, dispatch, complete)
//! while holding its state lock, so the order of events in a sink matches the
//! order in which the scheduler made its decisions.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::util::clock::now_ms;
use crate::util::serde::{Priority, UnitId};

/// Lifecycle transition recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Unit accepted into the pending queue.
    Submit,
    /// Unit moved from pending to running.
    Dispatch,
    /// Unit finished and its result was recorded.
    Complete,
}

/// Audit event structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Related unit identifier.
    pub unit_id: UnitId,
    /// Category of the unit.
    pub category: String,
    /// Priority of the unit.
    pub priority: Priority,
    /// Transition taken.
    pub action: AuditAction,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context (failure message on completion).
    pub detail: Option<String>,
}

/// Audit sink abstraction.
///
/// The scheduler calls `record` outside its state lock, one event at a time and
/// in the order its decisions were made, so a sink may query the scheduler.
pub trait AuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: AuditEvent);
}

/// Bounded in-memory audit sink for tests and diagnostics.
///
/// Cloning yields another handle to the same buffer, so a caller can keep one
/// clone and hand another to a scheduler.
#[derive(Clone)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<VecDeque<AuditEvent>>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink keeping at most `max_events` events.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(max_events.min(1024)))),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Unit ids of every event with the given action, oldest first.
    #[must_use]
    pub fn unit_ids(&self, action: AuditAction) -> Vec<UnitId> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.action == action)
            .map(|e| e.unit_id.clone())
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

/// Helper to build an audit event from context.
pub fn build_audit_event(
    unit_id: impl Into<UnitId>,
    category: impl Into<String>,
    priority: Priority,
    action: AuditAction,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        unit_id: unit_id.into(),
        category: category.into(),
        priority,
        action,
        created_at_ms: now_ms(),
        detail,
    }
}
