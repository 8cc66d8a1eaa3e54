//! Work items: the immutable description of one schedulable unit.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{AppResult, SchedulerError};
use crate::util::serde::{Priority, UnitId};

/// Category used when the caller does not assign one.
pub const DEFAULT_CATEGORY: &str = "general";

/// Boxed future produced by an in-process computation.
pub type ActionFuture = Pin<Box<dyn Future<Output = AppResult<serde_json::Value>> + Send + 'static>>;

/// An in-process computation. Invoked exactly once, when the unit is dispatched.
pub type ComputeFn = Box<dyn FnOnce() -> ActionFuture + Send + 'static>;

/// Identity and scheduling attributes of a work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMeta {
    /// Caller-assigned identifier, unique within a batch.
    pub id: UnitId,
    /// Human-readable label used in reports.
    pub name: String,
    /// Grouping key for aggregate breakdowns.
    pub category: String,
    /// Higher values dispatch earlier.
    pub priority: Priority,
}

/// External process to spawn for a process-backed unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    /// Program path or name resolved through `PATH`.
    pub program: String,
    /// Arguments passed to the program.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment overrides layered over the parent environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Working directory; inherits the parent's when unset.
    #[serde(default)]
    pub current_dir: Option<PathBuf>,
    /// Per-unit timeout after which the process is killed.
    #[serde(default, with = "timeout_ms", rename = "timeout_ms")]
    pub timeout: Option<Duration>,
}

impl ProcessSpec {
    /// Spawn `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            current_dir: None,
            timeout: None,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Override one environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Override several environment variables.
    #[must_use]
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Run the process in `dir`.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Kill the process if it runs longer than `timeout`.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

mod timeout_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

/// What a unit does when dispatched.
pub enum Action {
    /// In-process async computation producing a JSON value or an error.
    Compute(ComputeFn),
    /// External process; success is a zero exit code.
    Process(ProcessSpec),
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compute(_) => f.write_str("Compute(..)"),
            Self::Process(spec) => f.debug_tuple("Process").field(spec).finish(),
        }
    }
}

/// One schedulable unit of work.
///
/// The action is fixed at construction. Category and priority are assigned with
/// the `with_*` builders before the item is handed to a scheduler, which takes
/// ownership; nothing mutates an item after submission.
#[derive(Debug)]
pub struct WorkItem {
    meta: UnitMeta,
    action: Action,
}

impl WorkItem {
    /// Create an item with default category and priority 0.
    pub fn new(id: impl Into<UnitId>, name: impl Into<String>, action: Action) -> Self {
        Self {
            meta: UnitMeta {
                id: id.into(),
                name: name.into(),
                category: DEFAULT_CATEGORY.to_string(),
                priority: 0,
            },
            action,
        }
    }

    /// Create an item with a freshly generated UUID v4 identifier.
    pub fn anonymous(name: impl Into<String>, action: Action) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), name, action)
    }

    /// Create an in-process item from an async closure.
    pub fn compute<F, Fut>(id: impl Into<UnitId>, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<serde_json::Value>> + Send + 'static,
    {
        Self::new(id, name, Action::Compute(Box::new(move || Box::pin(f()))))
    }

    /// Create a process-backed item.
    pub fn process(id: impl Into<UnitId>, name: impl Into<String>, spec: ProcessSpec) -> Self {
        Self::new(id, name, Action::Process(spec))
    }

    /// Assign the dispatch priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.meta.priority = priority;
        self
    }

    /// Assign the reporting category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.meta.category = category.into();
        self
    }

    /// Identity and scheduling attributes.
    #[must_use]
    pub const fn meta(&self) -> &UnitMeta {
        &self.meta
    }

    /// Identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.meta.id
    }

    /// Priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.meta.priority
    }

    /// The action to run.
    #[must_use]
    pub const fn action(&self) -> &Action {
        &self.action
    }

    /// Split into metadata and action for execution.
    #[must_use]
    pub fn into_parts(self) -> (UnitMeta, Action) {
        (self.meta, self.action)
    }

    /// Check required fields before the item is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidWorkItem`] for an empty id, name or
    /// category, an empty process program, or a zero process timeout.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        let id = self.meta.id.as_str();
        if id.trim().is_empty() {
            return Err(SchedulerError::invalid_item(id, "id must not be empty"));
        }
        if self.meta.name.trim().is_empty() {
            return Err(SchedulerError::invalid_item(id, "name must not be empty"));
        }
        if self.meta.category.trim().is_empty() {
            return Err(SchedulerError::invalid_item(id, "category must not be empty"));
        }
        if let Action::Process(spec) = &self.action {
            if spec.program.trim().is_empty() {
                return Err(SchedulerError::invalid_item(id, "process program must not be empty"));
            }
            if spec.timeout == Some(Duration::ZERO) {
                return Err(SchedulerError::invalid_item(id, "process timeout must be greater than 0"));
            }
        }
        Ok(())
    }
}
