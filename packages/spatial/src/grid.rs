//! Grid-bucketed index of the incidents currently inside the trailing
//! window.
//!
//! Cells are square in lat/lng degrees. The grid only prunes candidates;
//! whether a candidate is a neighbour is always decided by the exact
//! haversine distance.

use std::collections::{BTreeMap, VecDeque};
use std::ops::RangeInclusive;

use crate::geo::SearchBounds;

/// Integer coordinates of a grid cell.
///
/// Ordered row-major (`y` first) so that one row of cells is a contiguous
/// key range in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
    /// Row, from latitude.
    pub y: i64,
    /// Column, from longitude.
    pub x: i64,
}

/// The rows and column ranges covering a search circle's bounding box.
///
/// A circle that crosses the antimeridian needs two disjoint column ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchBlock {
    /// Rows to scan.
    pub rows: RangeInclusive<i64>,
    /// Column ranges to scan in each row.
    pub columns: [Option<RangeInclusive<i64>>; 2],
}

impl SearchBlock {
    /// Number of cells in the block.
    #[must_use]
    pub fn cell_count(&self) -> u64 {
        let span = |r: &RangeInclusive<i64>| r.end().abs_diff(*r.start()) + 1;
        let columns: u64 = self.columns.iter().flatten().map(span).sum();
        span(&self.rows) * columns
    }
}

/// Spatial index mapping grid cells to the active incident indices in
/// them, oldest first.
///
/// Indices are inserted in chronological order, so the incident that
/// expires next is always at the front of its bucket.
#[derive(Debug)]
pub struct SpatialGrid {
    cell_deg: f64,
    cells: BTreeMap<CellKey, VecDeque<usize>>,
    len: usize,
}

impl SpatialGrid {
    /// Creates an empty grid with square cells of `cell_deg` degrees.
    #[must_use]
    pub const fn new(cell_deg: f64) -> Self {
        Self {
            cell_deg,
            cells: BTreeMap::new(),
            len: 0,
        }
    }

    /// Number of active incidents.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of non-empty cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn axis_index(&self, deg: f64) -> i64 {
        (deg / self.cell_deg).floor() as i64
    }

    /// The cell containing a point.
    #[must_use]
    pub fn cell_of(&self, lat: f64, lng: f64) -> CellKey {
        CellKey {
            y: self.axis_index(lat),
            x: self.axis_index(lng),
        }
    }

    /// Adds an incident index to a cell.
    pub fn insert(&mut self, key: CellKey, index: usize) {
        self.cells.entry(key).or_default().push_back(index);
        self.len += 1;
    }

    /// Removes an incident index from a cell, deleting the cell once it is
    /// empty. Returns `false` if the index was not in that cell.
    ///
    /// O(1) when `index` is the oldest entry in the cell, which is always
    /// the case for chronological expiry.
    pub fn remove(&mut self, key: CellKey, index: usize) -> bool {
        let Some(bucket) = self.cells.get_mut(&key) else {
            return false;
        };

        if bucket.front() == Some(&index) {
            bucket.pop_front();
        } else if let Some(pos) = bucket.iter().position(|&i| i == index) {
            bucket.remove(pos);
        } else {
            return false;
        }

        if bucket.is_empty() {
            self.cells.remove(&key);
        }
        self.len -= 1;
        true
    }

    /// Cells covering the bounding box of the circle of `radius_km` around
    /// a point.
    ///
    /// With 1 km cells and a 1 km radius this is the 3x3 neighbourhood at
    /// low latitudes; the block grows in longitude as meridians converge so
    /// it always contains every point within the radius.
    #[must_use]
    pub fn search_block(&self, lat: f64, lng: f64, radius_km: f64) -> SearchBlock {
        let bounds = SearchBounds::around(lat, radius_km);

        let south = (lat - bounds.lat_deg).max(-90.0);
        let north = (lat + bounds.lat_deg).min(90.0);
        let rows = self.axis_index(south)..=self.axis_index(north);

        let all_columns = self.axis_index(-180.0)..=self.axis_index(180.0);

        let columns = match bounds.lng_deg {
            None => [Some(all_columns), None],
            Some(half_width) => {
                let west = lng - half_width;
                let east = lng + half_width;

                if west < -180.0 && east > 180.0 {
                    [Some(all_columns), None]
                } else if west < -180.0 {
                    self.wrapped_columns(west + 360.0, east)
                } else if east > 180.0 {
                    self.wrapped_columns(west, east - 360.0)
                } else {
                    [Some(self.axis_index(west)..=self.axis_index(east)), None]
                }
            }
        };

        SearchBlock { rows, columns }
    }

    /// Column ranges for a box crossing the antimeridian: `[west, 180]` and
    /// `[-180, east]`. Falls back to every column if the two pieces would
    /// share a cell.
    fn wrapped_columns(&self, west: f64, east: f64) -> [Option<RangeInclusive<i64>>; 2] {
        let eastern = self.axis_index(west)..=self.axis_index(180.0);
        let western = self.axis_index(-180.0)..=self.axis_index(east);

        if western.end() >= eastern.start() {
            [Some(self.axis_index(-180.0)..=self.axis_index(180.0)), None]
        } else {
            [Some(western), Some(eastern)]
        }
    }

    /// Calls `f` with every active index in the block's cells.
    ///
    /// Rows are scanned as key ranges, so empty cells cost nothing.
    pub fn for_each_in_block(&self, block: &SearchBlock, mut f: impl FnMut(usize)) {
        for y in block.rows.clone() {
            for columns in block.columns.iter().flatten() {
                let from = CellKey {
                    y,
                    x: *columns.start(),
                };
                let to = CellKey {
                    y,
                    x: *columns.end(),
                };
                for bucket in self.cells.range(from..=to).map(|(_, bucket)| bucket) {
                    bucket.iter().copied().for_each(&mut f);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(grid: &SpatialGrid, block: &SearchBlock) -> Vec<usize> {
        let mut found = Vec::new();
        grid.for_each_in_block(block, |i| found.push(i));
        found.sort_unstable();
        found
    }

    #[test]
    fn cell_of_floors_negative_coordinates() {
        let grid = SpatialGrid::new(0.5);
        assert_eq!(grid.cell_of(0.25, -0.25), CellKey { y: 0, x: -1 });
        assert_eq!(grid.cell_of(-0.5, 0.5), CellKey { y: -1, x: 1 });
    }

    #[test]
    fn insert_and_remove_track_len_and_cells() {
        let mut grid = SpatialGrid::new(1.0);
        let a = grid.cell_of(0.5, 0.5);
        let b = grid.cell_of(5.5, 5.5);
        grid.insert(a, 0);
        grid.insert(a, 1);
        grid.insert(b, 2);
        assert_eq!(grid.len(), 3);
        assert_eq!(grid.cell_count(), 2);

        assert!(grid.remove(a, 0));
        assert!(!grid.remove(a, 0));
        assert!(grid.remove(b, 2));
        assert_eq!(grid.cell_count(), 1);
        assert!(grid.remove(a, 1));
        assert!(grid.is_empty());
        assert_eq!(grid.cell_count(), 0);
    }

    #[test]
    fn remove_out_of_order_entry() {
        let mut grid = SpatialGrid::new(1.0);
        let key = grid.cell_of(0.5, 0.5);
        for i in 0..4 {
            grid.insert(key, i);
        }
        assert!(grid.remove(key, 2));
        let block = SearchBlock {
            rows: 0..=0,
            columns: [Some(0..=0), None],
        };
        assert_eq!(collect(&grid, &block), vec![0, 1, 3]);
    }

    #[test]
    fn low_latitude_block_is_three_by_three() {
        let grid = SpatialGrid::new(1.0 / 111.32);
        let block = grid.search_block(0.004, 0.004, 1.0);
        assert_eq!(block.cell_count(), 9);
    }

    #[test]
    fn london_block_widens_in_longitude() {
        let grid = SpatialGrid::new(1.0 / 111.32);
        let block = grid.search_block(51.5, -0.1, 1.0);
        let columns = block.columns[0].clone().unwrap();
        let width = columns.end() - columns.start() + 1;
        assert!(width >= 4, "expected at least 4 columns, got {width}");
        assert!(block.columns[1].is_none());
    }

    #[test]
    fn block_wraps_across_the_antimeridian() {
        let mut grid = SpatialGrid::new(1.0 / 111.32);
        let west_side = grid.cell_of(0.0, -179.999);
        let far_away = grid.cell_of(0.0, -170.0);
        grid.insert(west_side, 7);
        grid.insert(far_away, 8);

        let block = grid.search_block(0.0, 179.999, 1.0);
        assert!(block.columns[1].is_some());
        assert_eq!(collect(&grid, &block), vec![7]);
    }

    #[test]
    fn polar_block_scans_every_longitude() {
        let mut grid = SpatialGrid::new(1.0 / 111.32);
        let across_pole = grid.cell_of(89.998, 120.0);
        grid.insert(across_pole, 3);

        let block = grid.search_block(89.998, -60.0, 1.0);
        assert_eq!(collect(&grid, &block), vec![3]);
    }
}
