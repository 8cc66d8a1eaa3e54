//! Core scheduling abstractions: work items, execution, scheduling, workflows
//! and result aggregation.

pub mod aggregate;
pub mod audit;
pub mod error;
pub mod executor;
pub mod run_result;
pub mod scheduler;
pub mod work_item;
pub mod workflow;

pub use aggregate::{BatchStats, BatchSummary, DurationStats, FailureRecord};
pub use audit::{build_audit_event, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink};
pub use error::{AppResult, SchedulerError, UnitFailure};
pub use executor::{ActionExecutor, UnitExecutor};
pub use run_result::RunResult;
pub use scheduler::{RunHandle, Scheduler, SchedulerStats, Spawn};
pub use work_item::{
    Action, ActionFuture, ComputeFn, ProcessSpec, UnitMeta, WorkItem, DEFAULT_CATEGORY,
};
pub use workflow::{
    StepMode, Workflow, WorkflowReport, WorkflowResult, WorkflowState, WorkflowStep,
};
