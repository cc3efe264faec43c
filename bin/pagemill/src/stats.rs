use std::{collections::BTreeMap, time::Duration};

use hdrhistogram::Histogram;
use serde::Serialize;
use tracing::warn;

use crate::{behavior::Outcome, operation::Operation};

// Latencies are tracked in microseconds, from 1µs up to 60s.
const LATENCY_LOW_US: u64 = 1;
const LATENCY_HIGH_US: u64 = 60_000_000;
const LATENCY_SIGFIGS: u8 = 3;

fn new_latency_histogram() -> Histogram<u64> {
    // Bounds are constant and valid, so this cannot fail.
    Histogram::new_with_bounds(LATENCY_LOW_US, LATENCY_HIGH_US, LATENCY_SIGFIGS)
        .expect("latency histogram bounds should be valid")
}

/// Outcome tallies for a single operation.
#[derive(Clone, Debug)]
pub struct OperationStats {
    completed: u64,
    skipped: u64,
    failures: BTreeMap<String, u64>,
    latency_us: Histogram<u64>,
}

impl OperationStats {
    fn new() -> Self {
        Self {
            completed: 0,
            skipped: 0,
            failures: BTreeMap::new(),
            latency_us: new_latency_histogram(),
        }
    }

    /// Number of invocations that completed.
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Number of invocations skipped because there was no book to act on.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Number of invocations that failed.
    pub fn failed(&self) -> u64 {
        self.failures.values().sum()
    }

    /// Number of failed invocations, by kind of failure.
    pub fn failures(&self) -> &BTreeMap<String, u64> {
        &self.failures
    }

    /// Total number of invocations.
    pub fn invocations(&self) -> u64 {
        self.completed + self.skipped + self.failed()
    }

    /// Number of latency samples recorded.
    pub fn latency_samples(&self) -> u64 {
        self.latency_us.len()
    }

    fn record_latency(&mut self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.latency_us.saturating_record(micros);
    }

    fn merge(&mut self, other: OperationStats) {
        self.completed += other.completed;
        self.skipped += other.skipped;
        for (kind, count) in other.failures {
            *self.failures.entry(kind).or_insert(0) += count;
        }
        if let Err(e) = self.latency_us.add(&other.latency_us) {
            warn!(error = %e, "Failed to merge latency histogram.");
        }
    }

    fn summary(&self, operation: Operation) -> OperationSummary {
        let latency_ms = (self.latency_samples() > 0).then(|| LatencySummary::from_histogram(&self.latency_us));

        OperationSummary {
            operation: operation.name(),
            invocations: self.invocations(),
            completed: self.completed(),
            skipped: self.skipped(),
            failed: self.failed(),
            failures: self.failures().clone(),
            latency_ms,
        }
    }
}

/// Per-operation outcome accounting.
///
/// Each actor keeps its own `Stats`, which are merged once the actors have stopped.
#[derive(Clone, Debug, Default)]
pub struct Stats {
    operations: BTreeMap<Operation, OperationStats>,
}

impl Stats {
    /// Creates an empty `Stats`.
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, operation: Operation) -> &mut OperationStats {
        self.operations.entry(operation).or_insert_with(OperationStats::new)
    }

    /// Records an invocation that did not fail.
    ///
    /// Latency is only tracked for completed invocations.
    pub fn record_outcome(&mut self, operation: Operation, outcome: Outcome, latency: Duration) {
        let stats = self.entry(operation);
        match outcome {
            Outcome::Completed => {
                stats.completed += 1;
                stats.record_latency(latency);
            }
            Outcome::Skipped => stats.skipped += 1,
        }
    }

    /// Records a failed invocation under the given kind of failure.
    pub fn record_failure(&mut self, operation: Operation, kind: String, latency: Duration) {
        let stats = self.entry(operation);
        *stats.failures.entry(kind).or_insert(0) += 1;
        stats.record_latency(latency);
    }

    /// Merges another `Stats` into this one.
    pub fn merge(&mut self, other: Stats) {
        for (operation, stats) in other.operations {
            match self.operations.get_mut(&operation) {
                Some(existing) => existing.merge(stats),
                None => {
                    self.operations.insert(operation, stats);
                }
            }
        }
    }

    /// Returns the tallies for the given operation, if it was invoked at least once.
    #[cfg(test)]
    pub fn operation(&self, operation: Operation) -> Option<&OperationStats> {
        self.operations.get(&operation)
    }

    /// Total number of invocations, across all operations.
    pub fn invocations(&self) -> u64 {
        self.operations.values().map(OperationStats::invocations).sum()
    }

    /// Builds a summary of these stats, given how long the run took.
    pub fn summary(&self, elapsed: Duration) -> Summary {
        let operations: Vec<_> = self
            .operations
            .iter()
            .map(|(operation, stats)| stats.summary(*operation))
            .collect();

        let invocations = operations.iter().map(|op| op.invocations).sum::<u64>();
        let elapsed_secs = elapsed.as_secs_f64();
        let throughput_per_sec = if elapsed_secs > 0.0 {
            invocations as f64 / elapsed_secs
        } else {
            0.0
        };

        Summary {
            elapsed_secs,
            invocations,
            completed: operations.iter().map(|op| op.completed).sum(),
            skipped: operations.iter().map(|op| op.skipped).sum(),
            failed: operations.iter().map(|op| op.failed).sum(),
            throughput_per_sec,
            operations,
        }
    }
}

/// Latency distribution, in milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LatencySummary {
    pub mean: f64,
    pub p50: f64,
    pub p90: f64,
    pub p99: f64,
    pub max: f64,
}

impl LatencySummary {
    fn from_histogram(histogram: &Histogram<u64>) -> Self {
        let to_ms = |micros: u64| micros as f64 / 1000.0;

        Self {
            mean: histogram.mean() / 1000.0,
            p50: to_ms(histogram.value_at_quantile(0.50)),
            p90: to_ms(histogram.value_at_quantile(0.90)),
            p99: to_ms(histogram.value_at_quantile(0.99)),
            max: to_ms(histogram.max()),
        }
    }
}

/// Summary of a single operation.
#[derive(Clone, Debug, Serialize)]
pub struct OperationSummary {
    pub operation: &'static str,
    pub invocations: u64,
    pub completed: u64,
    pub skipped: u64,
    pub failed: u64,
    pub failures: BTreeMap<String, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<LatencySummary>,
}

/// Summary of a whole run.
#[derive(Clone, Debug, Serialize)]
pub struct Summary {
    pub elapsed_secs: f64,
    pub invocations: u64,
    pub completed: u64,
    pub skipped: u64,
    pub failed: u64,
    pub throughput_per_sec: f64,
    pub operations: Vec<OperationSummary>,
}
