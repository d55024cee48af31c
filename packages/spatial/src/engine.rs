//! Sliding-window neighbor counting.
//!
//! Incidents are swept once in chronological order. An expiry cursor drops
//! incidents that fall out of the trailing window from the grid, and each
//! incident is only admitted to the grid once the sweep reaches a strictly
//! later month, so an incident never sees itself, its own month, or the
//! future.

use std::ops::Range;

use crime_risk_crime_models::{Incident, MonthStamp};

use crate::config::NeighborCountConfig;
use crate::error::{InvalidInput, NeighborCountError};
use crate::geo::haversine_km;
use crate::grid::SpatialGrid;
use crate::progress::{NullProgress, ProgressCallback};

/// How many incidents are processed between progress reports.
pub const PROGRESS_INTERVAL: usize = 50_000;

/// Counts, for each incident, the earlier incidents within
/// `config.radius_km` and inside the trailing `config.window_months`.
///
/// `incidents` must already be sorted by month; the engine does not sort.
/// The result has the same length and order as `incidents`.
///
/// # Errors
///
/// Returns [`NeighborCountError::InvalidInput`] if the configuration is
/// invalid, the incidents are out of order, or any incident has unusable
/// coordinates. Nothing is counted when validation fails.
pub fn compute_neighbor_counts(
    incidents: &[Incident],
    config: &NeighborCountConfig,
) -> Result<Vec<u32>, NeighborCountError> {
    compute_neighbor_counts_with_progress(incidents, config, &NullProgress)
}

/// Same as [`compute_neighbor_counts`], reporting progress every
/// [`PROGRESS_INTERVAL`] incidents.
///
/// # Errors
///
/// See [`compute_neighbor_counts`].
pub fn compute_neighbor_counts_with_progress(
    incidents: &[Incident],
    config: &NeighborCountConfig,
    progress: &dyn ProgressCallback,
) -> Result<Vec<u32>, NeighborCountError> {
    let total = incidents.len();
    progress.set_message(format!("Validating {total} incidents"));
    validate(incidents, config)?;

    log::info!(
        "Counting neighbors within {} km over the previous {} months for {total} incidents",
        config.radius_km,
        config.window_months,
    );
    progress.set_total(total as u64);
    progress.set_message("Counting neighbors".to_string());

    let counts = sweep(incidents, config, 0, 0..total, progress)?;

    let non_zero = counts.iter().filter(|&&c| c > 0).count();
    log::info!("Neighbor counts complete: {non_zero}/{total} incidents have neighbors");
    progress.finish(format!("counted neighbors for {total} incidents"));

    Ok(counts)
}

/// Checks the configuration and every incident before any counting starts.
///
/// # Errors
///
/// Returns the first contract violation found.
pub fn validate(incidents: &[Incident], config: &NeighborCountConfig) -> Result<(), InvalidInput> {
    config.validate()?;

    let mut previous: Option<MonthStamp> = None;
    for (index, incident) in incidents.iter().enumerate() {
        if !incident.has_valid_coordinates() {
            return Err(InvalidInput::InvalidCoordinates {
                index,
                latitude: incident.latitude,
                longitude: incident.longitude,
            });
        }
        if let Some(previous) = previous
            && incident.month < previous
        {
            return Err(InvalidInput::Unsorted {
                index,
                previous,
                month: incident.month,
            });
        }
        previous = Some(incident.month);
    }

    // Sorted input means the first incident has the earliest cutoff.
    if let Some(first) = incidents.first() {
        window_cutoff(first.month, config.window_months)?;
    }

    Ok(())
}

/// The latest month that is outside the window ending at `month`.
pub(crate) fn window_cutoff(month: MonthStamp, window_months: u32) -> Result<MonthStamp, InvalidInput> {
    month
        .minus_months(window_months)
        .ok_or_else(|| InvalidInput::Degenerate {
            reason: format!("{month} minus {window_months} months is outside the calendar range"),
        })
}

/// The grid plus the two cursors that bound the incidents in it.
///
/// Incidents `expiry..frontier` are in the grid; `frontier..` are either
/// pending (same month as the incident being counted) or not reached yet.
struct ActiveWindow<'a> {
    incidents: &'a [Incident],
    grid: SpatialGrid,
    radius_km: f64,
    expiry: usize,
    frontier: usize,
}

impl<'a> ActiveWindow<'a> {
    fn new(incidents: &'a [Incident], config: &NeighborCountConfig, start: usize) -> Self {
        Self {
            incidents,
            grid: SpatialGrid::new(config.cell_deg()),
            radius_km: config.radius_km,
            expiry: start,
            frontier: start,
        }
    }

    /// Moves every pending incident from a month before `month` into the
    /// grid, stopping at `end`.
    fn admit_before(&mut self, month: MonthStamp, end: usize) {
        while self.frontier < end && self.incidents[self.frontier].month < month {
            let incident = &self.incidents[self.frontier];
            let key = self.grid.cell_of(incident.latitude, incident.longitude);
            self.grid.insert(key, self.frontier);
            self.frontier += 1;
        }
    }

    /// Drops every grid incident from `cutoff` or earlier.
    fn expire_through(&mut self, cutoff: MonthStamp) {
        while self.expiry < self.frontier && self.incidents[self.expiry].month <= cutoff {
            let incident = &self.incidents[self.expiry];
            let key = self.grid.cell_of(incident.latitude, incident.longitude);
            let removed = self.grid.remove(key, self.expiry);
            debug_assert!(removed, "expired incident {} missing from grid", self.expiry);
            self.expiry += 1;
        }
    }

    fn count_neighbors(&self, incident: &Incident) -> u32 {
        let block = self
            .grid
            .search_block(incident.latitude, incident.longitude, self.radius_km);

        let mut count = 0;
        self.grid.for_each_in_block(&block, |j| {
            let other = &self.incidents[j];
            let distance = haversine_km(
                incident.latitude,
                incident.longitude,
                other.latitude,
                other.longitude,
            );
            if distance <= self.radius_km {
                count += 1;
            }
        });
        count
    }
}

/// Sweeps `incidents[lookback..emit.end]` and returns the counts for the
/// `emit` range.
///
/// `lookback` must be at or before the first incident inside the window of
/// `incidents[emit.start]`; starting there reproduces the grid state a full
/// sweep would have at `emit.start`.
pub(crate) fn sweep(
    incidents: &[Incident],
    config: &NeighborCountConfig,
    lookback: usize,
    emit: Range<usize>,
    progress: &dyn ProgressCallback,
) -> Result<Vec<u32>, InvalidInput> {
    let mut window = ActiveWindow::new(incidents, config, lookback);
    let mut counts = Vec::with_capacity(emit.len());
    let mut unreported = 0;

    for i in lookback..emit.end {
        let incident = &incidents[i];
        window.admit_before(incident.month, i);
        window.expire_through(window_cutoff(incident.month, config.window_months)?);

        if i < emit.start {
            continue;
        }

        counts.push(window.count_neighbors(incident));

        unreported += 1;
        if unreported == PROGRESS_INTERVAL {
            progress.inc(unreported as u64);
            unreported = 0;
            log::info!("processed {} / {} incidents", i + 1, incidents.len());
        }
    }

    progress.inc(unreported as u64);

    Ok(counts)
}
