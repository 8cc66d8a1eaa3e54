//! # Unit Scheduler
//!
//! A bounded-concurrency, priority-aware scheduler for independent units of work.
//!
//! A unit is either an in-process async computation or an external program run
//! with arguments, environment overrides and an optional timeout. Units are
//! submitted to a [`core::Scheduler`], which keeps at most `max_concurrency` of
//! them running at once and always dispatches the highest-priority pending unit
//! next (earliest submission first among equal priorities). Every submitted unit
//! yields exactly one [`core::RunResult`], whether it succeeds, fails, times out
//! or panics.
//!
//! ## Key Features
//!
//! - **Strict priority dispatch** with FIFO tie-breaking
//! - **Event-driven drain**: waiting for a batch never polls
//! - **Process execution** with stdout/stderr capture and kill-on-timeout
//! - **Workflows**: a parallel group followed by sequential steps
//! - **Batch statistics**: success rate, duration spread, throughput, per-category breakdown
//!
//! ```rust,ignore
//! use unit_scheduler::core::{ActionExecutor, BatchSummary, ProcessSpec, Scheduler, WorkItem};
//! use unit_scheduler::runtime::TokioSpawner;
//! use std::time::{Duration, Instant};
//!
//! let scheduler = Scheduler::new(4, ActionExecutor::new(), TokioSpawner::current())?;
//! let started = Instant::now();
//! scheduler.submit_all([
//!     WorkItem::process("smoke", "Smoke tests", ProcessSpec::new("pytest").arg("-q"))
//!         .with_priority(10)
//!         .with_category("smoke"),
//!     WorkItem::compute("warmup", "Warm cache", || async { Ok(serde_json::json!("ok")) }),
//! ])?;
//! let results = scheduler.drain().await;
//! println!("{}", BatchSummary::from_results(&results, started.elapsed()).with_concurrency(4));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Work items, executors, the scheduler, workflows and batch statistics.
pub mod core;
/// Configuration models for the scheduler, target environment and manifests.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// In-memory infrastructure: the pending-unit priority queue.
pub mod infra;
/// Runtime adapters and API helpers.
pub mod runtime;
/// Shared utilities.
pub mod util;
