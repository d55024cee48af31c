#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spatio-temporal neighbor counting for geolocated incidents.
//!
//! For every incident in a month-sorted sequence, counts the other
//! incidents that happened within a fixed great-circle radius and inside a
//! trailing window of calendar months. A grid index keyed by lat/lng cells
//! prunes candidates; an expiry cursor that only moves forward keeps the
//! index limited to the active window, so maintenance is linear in the
//! number of incidents.
//!
//! The engine performs no I/O. Reading, filtering, and writing records is
//! the ingest pipeline's job.

pub mod config;
pub mod engine;
pub mod error;
pub mod geo;
pub mod grid;
pub mod parallel;
pub mod progress;

pub use config::NeighborCountConfig;
pub use engine::{PROGRESS_INTERVAL, compute_neighbor_counts, compute_neighbor_counts_with_progress};
pub use error::{InvalidInput, NeighborCountError};
pub use parallel::{DEFAULT_CHUNK_LEN, compute_neighbor_counts_parallel};
