use std::path::Path;

use anyhow::{Context as _, Result};
use tracing::info;

use crate::stats::Summary;

/// Logs the summary of a run, with one line per operation.
pub fn log_summary(summary: &Summary) {
    info!(
        elapsed_secs = format_args!("{:.2}", summary.elapsed_secs),
        invocations = summary.invocations,
        completed = summary.completed,
        skipped = summary.skipped,
        failed = summary.failed,
        throughput_per_sec = format_args!("{:.2}", summary.throughput_per_sec),
        "Run complete."
    );

    for op in &summary.operations {
        match &op.latency_ms {
            Some(latency) => info!(
                operation = op.operation,
                invocations = op.invocations,
                completed = op.completed,
                skipped = op.skipped,
                failed = op.failed,
                failures = ?op.failures,
                p50_ms = format_args!("{:.2}", latency.p50),
                p99_ms = format_args!("{:.2}", latency.p99),
                max_ms = format_args!("{:.2}", latency.max),
                "Operation summary."
            ),
            None => info!(
                operation = op.operation,
                invocations = op.invocations,
                completed = op.completed,
                skipped = op.skipped,
                failed = op.failed,
                failures = ?op.failures,
                "Operation summary."
            ),
        }
    }
}

/// Writes the summary of a run to the given path, as pretty-printed JSON.
///
/// # Errors
///
/// If the summary cannot be serialized, or the file cannot be written, an error is returned.
pub fn write_report(path: &Path, summary: &Summary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize run summary.")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write report to '{}'.", path.display()))?;

    info!(path = %path.display(), "Wrote run report.");
    Ok(())
}
