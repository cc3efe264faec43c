use std::{
    num::{NonZeroU64, NonZeroUsize},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context as _, Result};
use clap::Parser;
use figment::{
    providers::{Env, Format as _, Yaml},
    Figment,
};
use rand::Rng;
use serde::Deserialize;
use serde_with::{serde_as, DurationSecondsWithFrac};

use crate::operation::OperationWeights;

const ENV_PREFIX: &str = "PAGEMILL_";

/// Drives a weighted mix of operations against a books API, from any number of concurrent simulated users.
#[derive(Clone, Parser)]
#[command(about)]
pub struct Cli {
    /// Path to the configuration file, in YAML format.
    ///
    /// Any setting can also be overridden with an environment variable prefixed with `PAGEMILL_`, using `__` to
    /// separate nested keys (for example, `PAGEMILL_WAIT_TIME__MIN_SECS=0.5`).
    pub config_path: PathBuf,

    /// Base URL of the books API, overriding `target`.
    #[arg(long)]
    pub target: Option<String>,

    /// Number of concurrent actors, overriding `actors`.
    #[arg(long)]
    pub actors: Option<NonZeroUsize>,

    /// How long to run for, in seconds, overriding `duration_secs`.
    #[arg(long)]
    pub duration_secs: Option<f64>,
}

const fn default_actors() -> NonZeroUsize {
    NonZeroUsize::MIN
}

const fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Range of the pause that an actor takes between two operations.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(try_from = "RawWaitTime")]
pub struct WaitTime {
    min: Duration,
    max: Duration,
}

impl WaitTime {
    /// Creates a new `WaitTime` spanning `min` to `max`, inclusive.
    ///
    /// # Errors
    ///
    /// If `min` is greater than `max`, an error is returned.
    pub fn new(min: Duration, max: Duration) -> Result<Self> {
        if min > max {
            bail!(
                "Minimum wait time ({:?}) must not be greater than maximum wait time ({:?}).",
                min,
                max
            );
        }

        Ok(Self { min, max })
    }

    /// Shortest pause.
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Longest pause.
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draws a pause duration, uniformly from the configured range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min == self.max {
            self.min
        } else {
            rng.random_range(self.min..=self.max)
        }
    }
}

impl Default for WaitTime {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(1),
            max: Duration::from_secs(2),
        }
    }
}

#[serde_as]
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWaitTime {
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    #[serde(default = "default_min_wait")]
    min_secs: Duration,

    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    #[serde(default = "default_max_wait")]
    max_secs: Duration,
}

fn default_min_wait() -> Duration {
    WaitTime::default().min
}

fn default_max_wait() -> Duration {
    WaitTime::default().max
}

impl TryFrom<RawWaitTime> for WaitTime {
    type Error = String;

    fn try_from(raw: RawWaitTime) -> Result<Self, Self::Error> {
        WaitTime::new(raw.min_secs, raw.max_secs).map_err(|e| e.to_string())
    }
}

/// Driver configuration.
#[serde_as]
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the books API.
    pub target: String,

    /// Number of concurrent actors.
    #[serde(default = "default_actors")]
    pub actors: NonZeroUsize,

    /// Pause between two operations of the same actor.
    #[serde(default)]
    pub wait_time: WaitTime,

    /// How long to run for.
    ///
    /// When unset, the run lasts until every actor has reached its iteration limit, or until interrupted.
    #[serde_as(as = "Option<DurationSecondsWithFrac<f64>>")]
    #[serde(default, rename = "duration_secs")]
    pub duration: Option<Duration>,

    /// Number of operations each actor runs before stopping.
    #[serde(default)]
    pub iterations: Option<NonZeroU64>,

    /// Timeout applied to each request.
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    #[serde(default = "default_request_timeout", rename = "request_timeout_secs")]
    pub request_timeout: Duration,

    /// Relative weight of each operation.
    #[serde(default)]
    pub weights: OperationWeights,

    /// Fixed seed for the actors' random number generators.
    ///
    /// With a seed, each actor picks the same sequence of operations and pauses on every run.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Where to write the run summary, as JSON.
    #[serde(default)]
    pub report_path: Option<PathBuf>,
}

impl Config {
    /// Loads the configuration named by the command line, applying environment and command-line overrides.
    ///
    /// # Errors
    ///
    /// If the configuration file cannot be read or parsed, or the resulting configuration is invalid, an error is
    /// returned.
    pub fn try_from_cli(cli: &Cli) -> Result<Self> {
        let mut config = Self::try_from_file(&cli.config_path)?;

        if let Some(target) = &cli.target {
            config.target = target.clone();
        }
        if let Some(actors) = cli.actors {
            config.actors = actors;
        }
        if let Some(duration_secs) = cli.duration_secs {
            config.duration = Some(
                Duration::try_from_secs_f64(duration_secs)
                    .with_context(|| format!("Invalid duration: {} seconds.", duration_secs))?,
            );
        }

        Ok(config)
    }

    /// Loads the configuration from the given YAML file, applying environment overrides.
    ///
    /// # Errors
    ///
    /// If the file cannot be read or parsed, an error is returned.
    pub fn try_from_file<P>(config_path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let config_path = config_path.as_ref();
        let config_file_raw = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read configuration file '{}'.", config_path.display()))?;

        Self::try_from_yaml(&config_file_raw)
    }

    fn try_from_yaml(raw: &str) -> Result<Self> {
        Figment::new()
            .merge(Yaml::string(raw))
            .merge(
                Env::prefixed(ENV_PREFIX)
                    .ignore(&["log_level", "log_format_json"])
                    .split("__"),
            )
            .extract()
            .context("Failed to parse configuration.")
    }
}
