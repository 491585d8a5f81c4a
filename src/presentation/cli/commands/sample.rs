use anyhow::Context;

use crate::domain::ports::collector::MetricsSampler;
use crate::domain::ports::store::ThresholdStore;
use crate::presentation::cli::formatters::snapshot_fmt::print_snapshot;

/// Take one sample and print it, coloured against the stored thresholds.
///
/// # Errors
///
/// Returns an error if sampling or JSON serialization fails.
pub fn run_sample(
    sampler: &dyn MetricsSampler,
    thresholds: &dyn ThresholdStore,
    json: bool,
) -> anyhow::Result<()> {
    let snapshot = sampler
        .sample()
        .context("Failed to sample host metrics")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let config = thresholds.get().unwrap_or_else(|e| {
        tracing::warn!("Thresholds unavailable: {e}");
        None
    });
    print_snapshot(&snapshot, config.as_ref());
    Ok(())
}
