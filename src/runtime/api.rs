//! Caller-facing helpers: manifest submission and serializable snapshots.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{BatchManifest, TargetEnv};
use crate::core::{RunHandle, Scheduler, SchedulerError, SchedulerStats, Spawn, UnitExecutor};

/// Serializable view of a scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerSnapshot {
    /// Counters at the time of the snapshot.
    pub stats: SchedulerStats,
    /// Whether anything is pending or running.
    pub busy: bool,
}

/// Health response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
}

/// Submit every unit of `manifest` as one atomic group.
///
/// # Errors
///
/// Returns [`SchedulerError::Config`] for an invalid manifest and propagates
/// work item validation errors; nothing is enqueued on error.
pub fn submit_manifest<E, S>(
    scheduler: &Scheduler<E, S>,
    manifest: &BatchManifest,
    target: &TargetEnv,
) -> Result<Vec<RunHandle>, SchedulerError>
where
    E: UnitExecutor,
    S: Spawn,
{
    manifest.validate().map_err(SchedulerError::Config)?;
    let handles = scheduler.submit_all(manifest.work_items(target))?;
    info!(units = handles.len(), api_url = %target.api_url(), "manifest submitted");
    Ok(handles)
}

/// Capture a snapshot of `scheduler`.
pub fn snapshot<E, S>(scheduler: &Scheduler<E, S>) -> SchedulerSnapshot
where
    E: UnitExecutor,
    S: Spawn,
{
    let stats = scheduler.stats();
    SchedulerSnapshot {
        busy: stats.active + stats.pending > 0,
        stats,
    }
}

/// Return a health payload.
#[must_use]
pub const fn health() -> Health {
    Health { ok: true }
}
