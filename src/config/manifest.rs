//! JSON batch manifests describing process units.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{SchedulerConfig, TargetEnv};
use crate::core::{Action, ProcessSpec, WorkItem, DEFAULT_CATEGORY};
use crate::util::serde::{Priority, UnitId};

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// One process unit in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestUnit {
    /// Identifier; a UUID is generated when absent.
    #[serde(default)]
    pub id: Option<UnitId>,
    /// Display name.
    pub name: String,
    /// Reporting category.
    #[serde(default = "default_category")]
    pub category: String,
    /// Dispatch priority, higher first.
    #[serde(default)]
    pub priority: Priority,
    /// Program to execute.
    pub program: String,
    /// Program arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Inject the [`TargetEnv`] variables before `env`.
    #[serde(default)]
    pub use_target_env: bool,
    /// Working directory.
    #[serde(default)]
    pub current_dir: Option<PathBuf>,
    /// Per-unit timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ManifestUnit {
    /// Build the work item for this unit.
    ///
    /// Variables listed in `env` win over target variables of the same name.
    #[must_use]
    pub fn to_work_item(&self, target: &TargetEnv) -> WorkItem {
        let mut spec = ProcessSpec::new(self.program.clone()).args(self.args.iter().cloned());
        if self.use_target_env {
            spec = spec.envs(target.overrides());
        }
        spec = spec.envs(self.env.clone());
        if let Some(dir) = &self.current_dir {
            spec = spec.current_dir(dir.clone());
        }
        if let Some(secs) = self.timeout_secs {
            spec = spec.timeout(Duration::from_secs(secs));
        }

        let item = match &self.id {
            Some(id) => WorkItem::process(id.clone(), self.name.clone(), spec),
            None => WorkItem::anonymous(self.name.clone(), Action::Process(spec)),
        };
        item.with_category(self.category.clone())
            .with_priority(self.priority)
    }
}

/// A batch of process units plus optional scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchManifest {
    /// Scheduler settings for this batch.
    #[serde(default)]
    pub scheduler: Option<SchedulerConfig>,
    /// Units in submission order.
    pub units: Vec<ManifestUnit>,
}

impl BatchManifest {
    /// Validate the manifest.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem: an invalid scheduler section,
    /// a blank name or program, a zero timeout, or a repeated explicit id.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(cfg) = &self.scheduler {
            cfg.validate()?;
        }
        let mut seen = HashSet::new();
        for (index, unit) in self.units.iter().enumerate() {
            if unit.name.trim().is_empty() {
                return Err(format!("units[{index}]: name must not be empty"));
            }
            if unit.program.trim().is_empty() {
                return Err(format!("units[{index}]: program must not be empty"));
            }
            if unit.category.trim().is_empty() {
                return Err(format!("units[{index}]: category must not be empty"));
            }
            if unit.timeout_secs == Some(0) {
                return Err(format!("units[{index}]: timeout_secs must be greater than 0"));
            }
            if let Some(id) = &unit.id {
                if !seen.insert(id.as_str()) {
                    return Err(format!("units[{index}]: duplicate id {id:?}"));
                }
            }
        }
        Ok(())
    }

    /// Parse a manifest from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation error message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let manifest: Self =
            serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Read and parse a manifest file.
    ///
    /// # Errors
    ///
    /// Returns an I/O, parse or validation error message.
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("{}: {e}", path.display()))?;
        Self::from_json_str(&raw)
    }

    /// Work items for every unit, in manifest order.
    #[must_use]
    pub fn work_items(&self, target: &TargetEnv) -> Vec<WorkItem> {
        self.units.iter().map(|u| u.to_work_item(target)).collect()
    }
}
