//! Error types for scheduler operations and per-unit failures.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::serde::UnitId;

/// Errors returned synchronously by the scheduler to its caller.
///
/// These never describe the outcome of a unit: a unit that fails is recorded as a
/// [`UnitFailure`] inside its `RunResult` and the batch keeps running.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The concurrency ceiling must be at least one.
    #[error("invalid max_concurrency {0}: must be greater than 0")]
    InvalidConcurrency(usize),
    /// A work item is missing required fields or is otherwise malformed.
    #[error("invalid work item `{id}`: {reason}")]
    InvalidWorkItem {
        /// Identifier of the rejected item (may be empty).
        id: UnitId,
        /// What is wrong with it.
        reason: String,
    },
    /// Configuration could not be parsed or failed validation.
    #[error("configuration error: {0}")]
    Config(String),
    /// The scheduler went away before delivering the result for this unit.
    #[error("result for unit `{0}` was dropped before delivery")]
    HandleDropped(UnitId),
}

impl SchedulerError {
    pub(crate) fn invalid_item(id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidWorkItem {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Why a single unit failed. Always absorbed into the unit's `RunResult`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitFailure {
    /// The in-process computation returned an error or panicked.
    #[error("action failed: {message}")]
    Action {
        /// Error message of the computation.
        message: String,
    },
    /// The spawned process exited non-zero, was killed by a signal, or never started.
    #[error("{}", describe_process_failure(*exit_code, detail))]
    Process {
        /// Exit code, when the process exited normally.
        exit_code: Option<i32>,
        /// Captured stderr, or the spawn/I/O error.
        detail: String,
    },
    /// The unit exceeded its allotted time and was terminated.
    #[error("timed out after {after_ms}ms")]
    Timeout {
        /// Timeout that was enforced, in milliseconds.
        after_ms: u64,
    },
}

fn describe_process_failure(exit_code: Option<i32>, detail: &str) -> String {
    let detail = detail.trim();
    match (exit_code, detail.is_empty()) {
        (Some(code), true) => format!("exit code: {code}"),
        (Some(code), false) => format!("exit code: {code}: {detail}"),
        (None, true) => "process terminated without an exit code".to_string(),
        (None, false) => format!("process failed: {detail}"),
    }
}

/// Application-facing result using anyhow for in-process actions.
pub type AppResult<T> = Result<T, anyhow::Error>;
