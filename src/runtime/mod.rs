//! Runtime adapters and caller-facing API helpers.

pub mod api;
pub mod tokio_spawner;

pub use api::{health, snapshot, submit_manifest, Health, SchedulerSnapshot};
pub use tokio_spawner::TokioSpawner;
