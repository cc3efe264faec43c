//! Logging.

use anyhow::{anyhow, Result};
use tracing::{level_filters::LevelFilter, Subscriber};
use tracing_subscriber::{
    layer::SubscriberExt as _, registry::LookupSpan, util::SubscriberInitExt as _, EnvFilter, Layer,
};

const LOG_LEVEL_ENV_VAR: &str = "PAGEMILL_LOG_LEVEL";
const LOG_FORMAT_JSON_ENV_VAR: &str = "PAGEMILL_LOG_FORMAT_JSON";

/// Logs a message to standard error and exits the process with a non-zero exit code.
pub fn fatal_and_exit(message: String) -> ! {
    eprintln!("FATAL: {}", message);
    std::process::exit(1);
}

/// Initializes the logging subsystem for `tracing`.
///
/// Filtering directives are read from `PAGEMILL_LOG_LEVEL`, falling back to `default_level` (or `INFO`) when it is not
/// set. When `PAGEMILL_LOG_FORMAT_JSON` is set to `true` or `1`, logs are emitted as JSON. Otherwise, they use a
/// compact, colored, human-readable format.
///
/// # Errors
///
/// If the logging subsystem was already initialized, an error will be returned.
pub fn initialize_logging(default_level: Option<LevelFilter>) -> Result<()> {
    let is_json = std::env::var(LOG_FORMAT_JSON_ENV_VAR)
        .map(|s| is_truthy(&s))
        .unwrap_or(false);

    let level_filter = EnvFilter::builder()
        .with_default_directive(default_level.unwrap_or(LevelFilter::INFO).into())
        .with_env_var(LOG_LEVEL_ENV_VAR)
        .from_env_lossy();

    let result = if is_json {
        tracing_subscriber::registry()
            .with(json_layer().with_filter(level_filter))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(pretty_layer().with_filter(level_filter))
            .try_init()
    };

    result.map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value == "true" || value == "1"
}

fn json_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::Layer::new()
        .json()
        .flatten_event(true)
        .with_target(true)
}

fn pretty_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::Layer::new()
        .compact()
        .with_ansi(true)
        .with_target(true)
}
