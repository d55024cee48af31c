//! Engine parameters.

use serde::{Deserialize, Serialize};

use crate::error::InvalidInput;

/// Default search radius in kilometers.
pub const DEFAULT_RADIUS_KM: f64 = 1.0;

/// Default trailing window in calendar months.
pub const DEFAULT_WINDOW_MONTHS: u32 = 12;

/// Default kilometers per degree used to size grid cells.
pub const DEFAULT_KM_PER_DEGREE: f64 = 111.32;

/// Largest grid coordinate magnitude we allow; keeps cell keys and their
/// neighbours far from `i64` overflow and exactly representable in `f64`.
const MAX_CELL_COORD: f64 = 9_007_199_254_740_992.0 / 4.0;

/// Parameters for [`crate::compute_neighbor_counts`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeighborCountConfig {
    /// Incidents within this great-circle distance (inclusive) count as
    /// neighbours.
    pub radius_km: f64,
    /// Length of the trailing window. An incident exactly this many months
    /// earlier is outside the window.
    pub window_months: u32,
    /// Kilometers per degree used to convert the radius into a grid cell
    /// edge. Only affects candidate pruning, never which incidents count.
    pub km_per_degree: f64,
}

impl Default for NeighborCountConfig {
    fn default() -> Self {
        Self {
            radius_km: DEFAULT_RADIUS_KM,
            window_months: DEFAULT_WINDOW_MONTHS,
            km_per_degree: DEFAULT_KM_PER_DEGREE,
        }
    }
}

impl NeighborCountConfig {
    /// Grid cell edge length in degrees.
    #[must_use]
    pub fn cell_deg(&self) -> f64 {
        self.radius_km / self.km_per_degree
    }

    /// Checks every parameter, including that grid keys for the whole
    /// lat/lng range stay representable.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvalidInput`] found.
    pub fn validate(&self) -> Result<(), InvalidInput> {
        if !(self.radius_km.is_finite() && self.radius_km > 0.0) {
            return Err(InvalidInput::NonPositiveRadius {
                radius_km: self.radius_km,
            });
        }
        if self.window_months == 0 {
            return Err(InvalidInput::NonPositiveWindow);
        }
        if !(self.km_per_degree.is_finite() && self.km_per_degree > 0.0) {
            return Err(InvalidInput::NonPositiveScale {
                km_per_degree: self.km_per_degree,
            });
        }

        let cell_deg = self.cell_deg();
        if !(cell_deg.is_normal() && 360.0 / cell_deg < MAX_CELL_COORD) {
            return Err(InvalidInput::Degenerate {
                reason: format!(
                    "grid cell of {cell_deg} degrees (radius {} km / {} km per degree) \
                     cannot index the lat/lng range",
                    self.radius_km, self.km_per_degree
                ),
            });
        }

        Ok(())
    }
}
