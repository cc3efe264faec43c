use std::{sync::Arc, time::Instant};

use anyhow::{Context as _, Result};
use bookstore_client::{BookstoreApi, HttpBookstore};
use rand::{rngs::StdRng, SeedableRng as _};
use tokio::{select, task::JoinSet, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument as _};

use crate::{
    actor::Actor,
    behavior::Behavior,
    config::Config,
    operation::OperationPicker,
    stats::{Stats, Summary},
};

/// Traffic driver.
///
/// Spawns the configured number of actors against the target, then waits for them to finish, merging the outcomes
/// they recorded into a single summary.
pub struct Driver<C> {
    client: C,
    config: Config,
    picker: Arc<OperationPicker>,
}

impl Driver<HttpBookstore> {
    /// Creates a new `Driver` that targets the books API named in the given configuration.
    ///
    /// # Errors
    ///
    /// If the target URL is invalid, the HTTP client cannot be created, or the operation weights are invalid, an error
    /// is returned.
    pub fn from_config(config: Config) -> Result<Self> {
        let client = HttpBookstore::builder(config.target.clone())
            .with_request_timeout(config.request_timeout)
            .build()
            .with_context(|| format!("Failed to create client for target '{}'.", config.target))?;

        Self::new(config, client)
    }
}

impl<C> Driver<C>
where
    C: BookstoreApi,
{
    /// Creates a new `Driver` that sends operations through the given client.
    ///
    /// # Errors
    ///
    /// If the operation weights are invalid, an error is returned.
    pub fn new(config: Config, client: C) -> Result<Self> {
        let picker = OperationPicker::new(&config.weights)?;

        Ok(Self {
            client,
            config,
            picker: Arc::new(picker),
        })
    }

    /// Runs the driver until every actor has stopped.
    ///
    /// Actors stop when the configured duration elapses, when they reach their iteration limit, or when `shutdown` is
    /// cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> Summary {
        let actor_count = self.config.actors.get();
        info!(
            url = %self.config.target,
            actors = actor_count,
            min_wait = ?self.config.wait_time.min(),
            max_wait = ?self.config.wait_time.max(),
            duration = ?self.config.duration,
            iterations = ?self.config.iterations,
            "Starting actors."
        );

        let start = Instant::now();
        let stop = shutdown.child_token();

        if let Some(duration) = self.config.duration {
            let stop = stop.clone();
            tokio::spawn(async move {
                select! {
                    _ = stop.cancelled() => {}
                    _ = sleep(duration) => {
                        info!("Run duration elapsed. Stopping actors...");
                        stop.cancel();
                    }
                }
            });
        }

        let mut actors = JoinSet::new();
        for id in 0..actor_count {
            let rng = match self.config.seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(id as u64)),
                None => StdRng::from_os_rng(),
            };

            let mut actor = Actor::new(
                id,
                Behavior::new(self.client.clone()),
                Arc::clone(&self.picker),
                self.config.wait_time,
                rng,
                stop.clone(),
            );
            if let Some(iterations) = self.config.iterations {
                actor = actor.with_iterations(iterations.get());
            }

            actors.spawn(actor.run().instrument(info_span!("actor", id)));
        }

        let mut stats = Stats::new();
        while let Some(result) = actors.join_next().await {
            match result {
                Ok(actor_stats) => stats.merge(actor_stats),
                Err(e) => error!(error = %e, "Actor task failed."),
            }
        }

        // Also stops the duration timer, if it is still pending.
        stop.cancel();

        let elapsed = start.elapsed();
        info!(?elapsed, invocations = stats.invocations(), "All actors stopped.");

        stats.summary(elapsed)
    }
}
