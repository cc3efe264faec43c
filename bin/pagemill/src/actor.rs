use std::{sync::Arc, time::Instant};

use bookstore_client::BookstoreApi;
use rand::rngs::StdRng;
use tokio::{select, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::{
    behavior::Behavior,
    config::WaitTime,
    operation::{Operation, OperationPicker},
    stats::Stats,
};

/// A single simulated user.
///
/// Runs operations one at a time, pausing for a random amount of time between each one, until either shutdown is
/// signalled or its iteration limit is reached.
pub struct Actor<C> {
    id: usize,
    behavior: Behavior<C>,
    picker: Arc<OperationPicker>,
    wait_time: WaitTime,
    iterations: Option<u64>,
    rng: StdRng,
    shutdown: CancellationToken,
}

impl<C> Actor<C>
where
    C: BookstoreApi,
{
    /// Creates a new `Actor`.
    pub fn new(
        id: usize, behavior: Behavior<C>, picker: Arc<OperationPicker>, wait_time: WaitTime, rng: StdRng,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            id,
            behavior,
            picker,
            wait_time,
            iterations: None,
            rng,
            shutdown,
        }
    }

    /// Stops the actor after it has run the given number of operations.
    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = Some(iterations);
        self
    }

    /// Runs the actor to completion, returning the outcomes it recorded.
    ///
    /// An operation still in flight when shutdown is signalled is abandoned and not recorded.
    pub async fn run(mut self) -> Stats {
        let mut stats = Stats::new();
        let mut iterations = 0;

        debug!(actor = self.id, "Actor started.");

        loop {
            if self.shutdown.is_cancelled() || self.iterations.is_some_and(|limit| iterations >= limit) {
                break;
            }

            let operation = self.picker.pick(&mut self.rng);
            if !self.run_once(operation, &mut stats).await {
                break;
            }
            iterations += 1;

            if self.iterations.is_some_and(|limit| iterations >= limit) {
                break;
            }

            let pause = self.wait_time.sample(&mut self.rng);
            select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = sleep(pause) => {}
            }
        }

        debug!(actor = self.id, iterations, "Actor stopped.");

        stats
    }

    // Returns `false` if shutdown interrupted the operation.
    async fn run_once(&self, operation: Operation, stats: &mut Stats) -> bool {
        let start = Instant::now();
        let result = select! {
            biased;
            _ = self.shutdown.cancelled() => return false,
            result = self.behavior.execute(operation) => result,
        };
        let latency = start.elapsed();

        match result {
            Ok(outcome) => {
                trace!(actor = self.id, %operation, ?outcome, ?latency, "Operation finished.");
                stats.record_outcome(operation, outcome, latency);
            }
            Err(e) => {
                debug!(actor = self.id, %operation, error = %e, "Operation failed.");
                stats.record_failure(operation, e.kind(), latency);
            }
        }

        true
    }
}
