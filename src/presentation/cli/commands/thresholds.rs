use anyhow::Context;

use crate::domain::entities::threshold::ThresholdPatch;
use crate::domain::ports::collector::MetricsSampler;
use crate::domain::ports::store::ThresholdStore;

/// # Errors
///
/// Returns an error if the threshold store cannot be read.
pub fn run_show(store: &dyn ThresholdStore) -> anyhow::Result<()> {
    match store.get().context("Failed to read thresholds")? {
        Some(config) => println!("{}", serde_json::to_string_pretty(&config)?),
        None => println!("No thresholds yet. Run `webspecs thresholds extend` or start the daemon."),
    }
    Ok(())
}

/// Merge a JSON change set into the stored thresholds.
///
/// Returns the number of leaves applied.
///
/// # Errors
///
/// Returns an error if `changes` is not JSON, or if no thresholds exist yet.
pub fn run_patch(store: &dyn ThresholdStore, changes: &str) -> anyhow::Result<usize> {
    let value: serde_json::Value =
        serde_json::from_str(changes).context("Threshold changes must be a JSON object")?;
    let patch = ThresholdPatch::from_value(&value);
    if patch.is_empty() {
        println!("Nothing to apply.");
        return Ok(0);
    }
    let applied = store.patch(&patch).context("Failed to patch thresholds")?;
    println!("{applied} threshold(s) updated.");
    Ok(applied)
}

/// Create the thresholds from a fresh sample, or add defaults for metrics
/// that appeared since they were created.
///
/// Returns the number of leaves added.
///
/// # Errors
///
/// Returns an error if sampling or the threshold store fails.
pub fn run_extend(store: &dyn ThresholdStore, sampler: &dyn MetricsSampler) -> anyhow::Result<usize> {
    let shape = sampler.sample().context("Failed to sample host metrics")?;
    if store.bootstrap_if_absent(&shape)? {
        println!("Thresholds created with defaults.");
        return Ok(0);
    }
    let added = store
        .extend_with_defaults(&shape)
        .context("Failed to extend thresholds")?;
    println!("{added} new threshold(s) added.");
    Ok(added)
}
