//! Chunked parallel neighbor counting.
//!
//! Counts for an incident depend only on incidents inside its trailing
//! window, so a chronological chunk can be swept on its own as long as the
//! sweep starts at the chunk's lookback: the first incident inside the
//! window of the chunk's first incident. Every chunk builds a private grid,
//! which makes the result identical to the sequential sweep.

use crime_risk_crime_models::Incident;
use rayon::prelude::*;

use crate::config::NeighborCountConfig;
use crate::engine::{sweep, validate, window_cutoff};
use crate::error::NeighborCountError;
use crate::progress::ProgressCallback;

/// Default number of incidents per parallel chunk.
pub const DEFAULT_CHUNK_LEN: usize = 100_000;

/// Parallel variant of [`crate::compute_neighbor_counts`].
///
/// Splits the sorted incidents into chunks of `chunk_len` (at least 1) and
/// counts each chunk on the rayon thread pool. Chunks re-sweep their
/// lookback range, so very small chunks repeat a lot of work.
///
/// # Errors
///
/// Same as [`crate::compute_neighbor_counts`]; validation happens once,
/// before any chunk runs.
pub fn compute_neighbor_counts_parallel(
    incidents: &[Incident],
    config: &NeighborCountConfig,
    chunk_len: usize,
    progress: &dyn ProgressCallback,
) -> Result<Vec<u32>, NeighborCountError> {
    let total = incidents.len();
    progress.set_message(format!("Validating {total} incidents"));
    validate(incidents, config)?;

    let chunk_len = chunk_len.max(1);
    let starts: Vec<usize> = (0..total).step_by(chunk_len).collect();

    log::info!(
        "Counting neighbors for {total} incidents in {} chunks of up to {chunk_len}",
        starts.len(),
    );
    progress.set_total(total as u64);
    progress.set_message(format!("Counting neighbors in {} chunks", starts.len()));

    let chunks = starts
        .par_iter()
        .map(|&start| {
            let end = (start + chunk_len).min(total);
            let cutoff = window_cutoff(incidents[start].month, config.window_months)?;
            let lookback = incidents[..start].partition_point(|i| i.month <= cutoff);
            log::debug!("chunk {start}..{end}: sweeping from lookback {lookback}");
            sweep(incidents, config, lookback, start..end, progress)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let counts = chunks.concat();
    progress.finish(format!("counted neighbors for {total} incidents"));

    Ok(counts)
}
