//! Builders to construct schedulers from configuration.

use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::core::{ActionExecutor, AuditSink, Scheduler, SchedulerError, Spawn, UnitExecutor};

/// Build a scheduler from configuration with a caller-supplied executor.
///
/// # Errors
///
/// Returns [`SchedulerError::Config`] when the configuration is invalid.
pub fn build_scheduler<E, S>(
    cfg: &SchedulerConfig,
    executor: E,
    spawner: S,
) -> Result<Scheduler<E, S>, SchedulerError>
where
    E: UnitExecutor,
    S: Spawn,
{
    SchedulerBuilder::new(cfg.clone(), executor, spawner).build()
}

/// Build a scheduler running [`ActionExecutor`] with the configured default timeout.
///
/// # Errors
///
/// Returns [`SchedulerError::Config`] when the configuration is invalid.
pub fn build_action_scheduler<S>(
    cfg: &SchedulerConfig,
    spawner: S,
) -> Result<Scheduler<ActionExecutor, S>, SchedulerError>
where
    S: Spawn,
{
    let mut executor = ActionExecutor::new();
    if let Some(timeout) = cfg.default_timeout() {
        executor = executor.with_default_timeout(timeout);
    }
    build_scheduler(cfg, executor, spawner)
}

/// Step-by-step scheduler construction, including an optional audit sink.
pub struct SchedulerBuilder<E, S> {
    config: SchedulerConfig,
    executor: E,
    spawner: S,
    audit: Option<Arc<dyn AuditSink>>,
}

impl<E, S> SchedulerBuilder<E, S>
where
    E: UnitExecutor,
    S: Spawn,
{
    /// Start from a configuration, executor and spawner.
    pub fn new(config: SchedulerConfig, executor: E, spawner: S) -> Self {
        Self {
            config,
            executor,
            spawner,
            audit: None,
        }
    }

    /// Override the concurrency ceiling.
    #[must_use]
    pub const fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.config.max_concurrency = max_concurrency;
        self
    }

    /// Record lifecycle events to `sink`.
    #[must_use]
    pub fn with_audit(mut self, sink: impl AuditSink + 'static) -> Self {
        self.audit = Some(Arc::new(sink));
        self
    }

    /// Validate the configuration and build the scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Config`] when the configuration is invalid.
    pub fn build(self) -> Result<Scheduler<E, S>, SchedulerError> {
        self.config
            .validate()
            .map_err(|e| SchedulerError::Config(format!("config invalid: {e}")))?;
        Scheduler::from_parts(self.config.max_concurrency, self.executor, self.spawner, self.audit)
    }
}
