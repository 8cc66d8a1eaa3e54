//! Configuration models: scheduler limits, target environment, batch manifests.

pub mod manifest;
pub mod scheduler;
pub mod target;

pub use manifest::{BatchManifest, ManifestUnit};
pub use scheduler::SchedulerConfig;
pub use target::TargetEnv;
