//! Workflow composition: a named list of parallel and sequential steps.
//!
//! Parallel steps are submitted together to one scheduler and awaited jointly.
//! Sequential steps then run one at a time through the same scheduler, each
//! finishing before the next is submitted. A workflow always completes; failed
//! steps only lower its success rate.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::{RunResult, Scheduler, SchedulerError, Spawn, UnitExecutor, WorkItem};

/// How a step is run relative to the other steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepMode {
    /// Run concurrently with the other parallel steps.
    Parallel,
    /// Run alone, after the parallel group and every earlier sequential step.
    Sequential,
}

/// Lifecycle of a workflow run. There is no failed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// Built but not run.
    NotStarted,
    /// Parallel group in flight.
    RunningParallel,
    /// Sequential steps in flight.
    RunningSequential,
    /// Both groups finished.
    Completed,
}

impl WorkflowState {
    /// Whether `next` directly follows `self`.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::RunningParallel)
                | (Self::RunningParallel, Self::RunningSequential)
                | (Self::RunningSequential, Self::Completed)
        )
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::RunningParallel => "running_parallel",
            Self::RunningSequential => "running_sequential",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// One step of a workflow.
#[derive(Debug)]
pub struct WorkflowStep {
    /// The unit to run.
    pub item: WorkItem,
    /// Parallel or sequential.
    pub mode: StepMode,
}

/// Outcome of a workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    /// Workflow name.
    pub name: String,
    /// Wall-clock time of the whole run.
    #[serde(rename = "total_duration_ms", with = "crate::util::serde::duration_ms")]
    pub total_duration: Duration,
    /// Successful steps over total steps; 0 for a workflow without steps.
    pub success_rate: f64,
    /// Parallel results in completion order, then sequential results in order.
    pub steps: Vec<RunResult>,
    /// Final state, always [`WorkflowState::Completed`].
    pub state: WorkflowState,
}

impl WorkflowResult {
    /// Number of successful steps.
    #[must_use]
    pub fn successful_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.success).count()
    }
}

/// A named composition of parallel and sequential steps.
///
/// ```rust,ignore
/// let result = Workflow::new("Data Flow Integration")
///     .sequential(seed_item)
///     .parallel(read_customers)
///     .parallel(read_invoices)
///     .run(ActionExecutor::new(), TokioSpawner::current())
///     .await?;
/// ```
#[derive(Debug)]
pub struct Workflow {
    name: String,
    steps: Vec<WorkflowStep>,
    max_concurrency: Option<usize>,
    state: WorkflowState,
}

impl Workflow {
    /// Create an empty workflow.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            max_concurrency: None,
            state: WorkflowState::NotStarted,
        }
    }

    /// Add a step with an explicit mode.
    #[must_use]
    pub fn step(mut self, item: WorkItem, mode: StepMode) -> Self {
        self.steps.push(WorkflowStep { item, mode });
        self
    }

    /// Add a parallel step.
    #[must_use]
    pub fn parallel(self, item: WorkItem) -> Self {
        self.step(item, StepMode::Parallel)
    }

    /// Add a sequential step.
    #[must_use]
    pub fn sequential(self, item: WorkItem) -> Self {
        self.step(item, StepMode::Sequential)
    }

    /// Cap the parallel group's concurrency. Defaults to the number of parallel steps.
    #[must_use]
    pub const fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = Some(max_concurrency);
        self
    }

    /// Workflow name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the workflow has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn advance(&mut self, next: WorkflowState) {
        debug_assert!(self.state.can_advance_to(next), "{} -> {next}", self.state);
        debug!(workflow = %self.name, from = %self.state, to = %next, "workflow state change");
        self.state = next;
    }

    /// Run every step and return the merged result.
    ///
    /// # Errors
    ///
    /// Configuration errors (an invalid step, `max_concurrency` of 0) are returned
    /// before any step runs. Step failures are never errors.
    pub async fn run<E, S>(mut self, executor: E, spawner: S) -> Result<WorkflowResult, SchedulerError>
    where
        E: UnitExecutor,
        S: Spawn,
    {
        for step in &self.steps {
            step.item.validate()?;
        }

        let (parallel, sequential): (Vec<_>, Vec<_>) = std::mem::take(&mut self.steps)
            .into_iter()
            .partition(|s| s.mode == StepMode::Parallel);
        let max_concurrency = self.max_concurrency.unwrap_or_else(|| parallel.len().max(1));
        let scheduler = Scheduler::new(max_concurrency, executor, spawner)?;

        info!(
            workflow = %self.name,
            parallel = parallel.len(),
            sequential = sequential.len(),
            "starting workflow"
        );
        let started = Instant::now();

        self.advance(WorkflowState::RunningParallel);
        scheduler.submit_all(parallel.into_iter().map(|s| s.item))?;
        let mut steps = scheduler.drain().await;

        self.advance(WorkflowState::RunningSequential);
        for step in sequential {
            let result = scheduler.submit(step.item)?.wait().await?;
            steps.push(result);
        }
        // Results were taken from the handles; clear the scheduler's copies.
        let _ = scheduler.drain().await;

        self.advance(WorkflowState::Completed);
        let total_duration = started.elapsed();
        let result = WorkflowResult {
            success_rate: success_rate(&steps),
            name: self.name,
            total_duration,
            steps,
            state: self.state,
        };
        info!(
            workflow = %result.name,
            successful = result.successful_steps(),
            total = result.steps.len(),
            duration_ms = crate::util::clock::as_millis_f64(total_duration),
            "workflow completed"
        );
        Ok(result)
    }
}

#[allow(clippy::cast_precision_loss)]
fn success_rate(steps: &[RunResult]) -> f64 {
    if steps.is_empty() {
        return 0.0;
    }
    steps.iter().filter(|s| s.success).count() as f64 / steps.len() as f64
}

/// Roll-up across several workflow runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowReport {
    /// Number of workflows.
    pub workflows: usize,
    /// Steps across all workflows.
    pub total_steps: usize,
    /// Successful steps across all workflows.
    pub successful_steps: usize,
    /// Mean of the per-workflow success rates; 0 without workflows.
    pub average_success_rate: f64,
}

impl WorkflowReport {
    /// Summarize a set of workflow results.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_workflows(results: &[WorkflowResult]) -> Self {
        let average_success_rate = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|w| w.success_rate).sum::<f64>() / results.len() as f64
        };
        Self {
            workflows: results.len(),
            total_steps: results.iter().map(|w| w.steps.len()).sum(),
            successful_steps: results.iter().map(WorkflowResult::successful_steps).sum(),
            average_success_rate,
        }
    }
}
