//! The outcome of running one work item.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{UnitFailure, UnitMeta};
use crate::util::serde::{Priority, UnitId};

/// Result of one unit. Exactly one is produced per submitted work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Identifier copied from the work item.
    pub id: UnitId,
    /// Name copied from the work item.
    pub name: String,
    /// Category copied from the work item.
    pub category: String,
    /// Priority copied from the work item.
    pub priority: Priority,
    /// Whether the unit succeeded.
    pub success: bool,
    /// Wall-clock time from dispatch to completion.
    #[serde(rename = "duration_ms", with = "crate::util::serde::duration_ms")]
    pub duration: Duration,
    /// Captured stdout followed by stderr (process units only).
    pub output: Option<String>,
    /// Value returned by the computation (in-process units only).
    pub value: Option<serde_json::Value>,
    /// Exit code of the process, when it exited normally.
    pub exit_code: Option<i32>,
    /// Failure description; present iff `success` is false.
    pub error: Option<UnitFailure>,
}

impl RunResult {
    /// Successful in-process result.
    #[must_use]
    pub fn computed(meta: UnitMeta, duration: Duration, value: serde_json::Value) -> Self {
        Self {
            value: Some(value),
            ..Self::base(meta, duration, None)
        }
    }

    /// Failed result of any kind.
    #[must_use]
    pub fn failed(meta: UnitMeta, duration: Duration, failure: UnitFailure) -> Self {
        Self::base(meta, duration, Some(failure))
    }

    /// Result of a process that ran to completion or was killed.
    #[must_use]
    pub fn from_process(
        meta: UnitMeta,
        duration: Duration,
        output: String,
        exit_code: Option<i32>,
        failure: Option<UnitFailure>,
    ) -> Self {
        Self {
            output: Some(output),
            exit_code,
            ..Self::base(meta, duration, failure)
        }
    }

    fn base(meta: UnitMeta, duration: Duration, failure: Option<UnitFailure>) -> Self {
        Self {
            id: meta.id,
            name: meta.name,
            category: meta.category,
            priority: meta.priority,
            success: failure.is_none(),
            duration,
            output: None,
            value: None,
            exit_code: None,
            error: failure,
        }
    }

    /// Human-readable failure message, if the unit failed.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }

    /// Duration in fractional milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> f64 {
        crate::util::clock::as_millis_f64(self.duration)
    }
}
