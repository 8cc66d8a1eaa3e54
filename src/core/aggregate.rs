//! Batch statistics over completed unit results.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::RunResult;
use crate::util::clock::as_millis_f64;
use crate::util::serde::UnitId;

/// Average, minimum and maximum unit duration in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationStats {
    /// Mean duration.
    pub average_ms: f64,
    /// Shortest duration.
    pub min_ms: f64,
    /// Longest duration.
    pub max_ms: f64,
}

/// Counts, rates and durations for one group of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Number of results.
    pub total: usize,
    /// Results with `success == true`.
    pub successful: usize,
    /// Results with `success == false`.
    pub failed: usize,
    /// `successful / total`, or 0 when there are no results.
    pub success_rate: f64,
    /// Duration distribution; `None` when there are no results.
    pub durations: Option<DurationStats>,
    /// Results per second of batch wall-clock time; 0 when no time elapsed.
    pub throughput: f64,
}

impl BatchStats {
    #[allow(clippy::cast_precision_loss)]
    fn compute<'a>(results: impl IntoIterator<Item = &'a RunResult>, elapsed: Duration) -> Self {
        let mut total = 0usize;
        let mut successful = 0usize;
        let mut sum_ms = 0.0;
        let mut min_ms = f64::INFINITY;
        let mut max_ms = f64::NEG_INFINITY;

        for result in results {
            total += 1;
            if result.success {
                successful += 1;
            }
            let ms = result.duration_ms();
            sum_ms += ms;
            min_ms = min_ms.min(ms);
            max_ms = max_ms.max(ms);
        }

        let (success_rate, durations) = if total == 0 {
            (0.0, None)
        } else {
            (
                successful as f64 / total as f64,
                Some(DurationStats {
                    average_ms: sum_ms / total as f64,
                    min_ms,
                    max_ms,
                }),
            )
        };

        let elapsed_secs = elapsed.as_secs_f64();
        let throughput = if elapsed_secs > 0.0 {
            total as f64 / elapsed_secs
        } else {
            0.0
        };

        Self {
            total,
            successful,
            failed: total - successful,
            success_rate,
            durations,
            throughput,
        }
    }
}

/// One failed unit, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Unit identifier.
    pub id: UnitId,
    /// Unit name.
    pub name: String,
    /// Unit category.
    pub category: String,
    /// Failure description.
    pub error: String,
}

/// Aggregate statistics for a batch, overall and per category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Statistics over every result.
    #[serde(flatten)]
    pub overall: BatchStats,
    /// Wall-clock span of the whole batch, supplied by the caller.
    #[serde(rename = "elapsed_ms", with = "crate::util::serde::duration_ms")]
    pub elapsed: Duration,
    /// Statistics per distinct category, ordered by category name.
    pub by_category: BTreeMap<String, BatchStats>,
    /// Every failed unit, in input order.
    pub failures: Vec<FailureRecord>,
    /// Concurrency ceiling the batch ran with, when known.
    pub concurrency: Option<usize>,
}

impl BatchSummary {
    /// Aggregate `results`.
    ///
    /// `elapsed` must be the wall-clock span of the batch, not the sum of unit
    /// durations (those overlap when units run concurrently).
    #[must_use]
    pub fn from_results(results: &[RunResult], elapsed: Duration) -> Self {
        let mut grouped: BTreeMap<&str, Vec<&RunResult>> = BTreeMap::new();
        for result in results {
            grouped.entry(result.category.as_str()).or_default().push(result);
        }

        let by_category = grouped
            .into_iter()
            .map(|(category, group)| (category.to_string(), BatchStats::compute(group, elapsed)))
            .collect();

        let failures = results
            .iter()
            .filter(|r| !r.success)
            .map(|r| FailureRecord {
                id: r.id.clone(),
                name: r.name.clone(),
                category: r.category.clone(),
                error: r.error_message().unwrap_or_else(|| "unknown error".to_string()),
            })
            .collect();

        Self {
            overall: BatchStats::compute(results, elapsed),
            elapsed,
            by_category,
            failures,
            concurrency: None,
        }
    }

    /// Attach the concurrency ceiling for reporting.
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Whether any unit failed.
    #[must_use]
    pub const fn has_failures(&self) -> bool {
        self.overall.failed > 0
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.overall;
        writeln!(f, "Batch summary ({:.2}ms)", as_millis_f64(self.elapsed))?;
        writeln!(f, "  Total units: {}", o.total)?;
        writeln!(f, "  Successful: {}", o.successful)?;
        writeln!(f, "  Failed: {}", o.failed)?;
        writeln!(f, "  Success rate: {:.1}%", o.success_rate * 100.0)?;
        if let Some(d) = o.durations {
            writeln!(f, "  Average duration: {:.2}ms", d.average_ms)?;
            writeln!(f, "  Max duration: {:.2}ms", d.max_ms)?;
            writeln!(f, "  Min duration: {:.2}ms", d.min_ms)?;
        }
        writeln!(f, "  Units per second: {:.2}", o.throughput)?;
        if let Some(concurrency) = self.concurrency {
            writeln!(f, "  Concurrency level: {concurrency}")?;
        }

        if !self.by_category.is_empty() {
            writeln!(f, "By category:")?;
            for (category, stats) in &self.by_category {
                write!(
                    f,
                    "  {category}: {}/{} passed ({:.1}%)",
                    stats.successful,
                    stats.total,
                    stats.success_rate * 100.0
                )?;
                if let Some(d) = stats.durations {
                    write!(f, ", avg {:.2}ms", d.average_ms)?;
                }
                writeln!(f)?;
            }
        }

        if !self.failures.is_empty() {
            writeln!(f, "Failed units:")?;
            for failure in &self.failures {
                writeln!(f, "  - {} [{}]: {}", failure.name, failure.id, failure.error)?;
            }
        }
        Ok(())
    }
}
