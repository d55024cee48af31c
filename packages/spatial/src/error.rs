//! Error types for the neighbor-count engine.

use crime_risk_crime_models::MonthStamp;

/// Errors returned by the neighbor-count engine.
///
/// Every failure is an input problem detected before any count is
/// produced; the engine never returns partial results.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NeighborCountError {
    /// The incidents or the configuration violate the engine's contract.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),
}

/// Specific contract violations behind [`NeighborCountError::InvalidInput`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidInput {
    /// Search radius is zero, negative, or not finite.
    #[error("radius must be a positive finite number of km, got {radius_km}")]
    NonPositiveRadius {
        /// The rejected radius.
        radius_km: f64,
    },

    /// Trailing window is zero months long.
    #[error("window must span at least one month")]
    NonPositiveWindow,

    /// Degrees-per-km scale is zero, negative, or not finite.
    #[error("km-per-degree scale must be a positive finite number, got {km_per_degree}")]
    NonPositiveScale {
        /// The rejected scale.
        km_per_degree: f64,
    },

    /// Incidents are not in non-decreasing month order.
    #[error("incident {index} ({month}) is earlier than the incident before it ({previous})")]
    Unsorted {
        /// Position of the first out-of-order incident.
        index: usize,
        /// Month of the incident at `index - 1`.
        previous: MonthStamp,
        /// Month of the incident at `index`.
        month: MonthStamp,
    },

    /// An incident has NaN, infinite, or out-of-range coordinates.
    #[error("incident {index} has unusable coordinates ({latitude}, {longitude})")]
    InvalidCoordinates {
        /// Position of the offending incident.
        index: usize,
        /// Its latitude.
        latitude: f64,
        /// Its longitude.
        longitude: f64,
    },

    /// Arithmetic on otherwise well-formed input cannot be carried out
    /// exactly (grid keys overflow, window cutoff leaves the calendar).
    #[error("degenerate input: {reason}")]
    Degenerate {
        /// What could not be computed.
        reason: String,
    },
}
