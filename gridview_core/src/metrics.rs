//! Occupancy statistics for the grid index.
//!
//! Computed on demand by [`ObjectGrid::stats`](crate::ObjectGrid::stats);
//! nothing here is maintained incrementally.

use serde::{Deserialize, Serialize};

/// Snapshot of grid occupancy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridStats {
    /// Objects currently tracked (created and not destroyed).
    pub tracked_objects: usize,
    /// Tracked objects that have received at least one position update.
    pub placed_objects: usize,
    /// Total number of cells in the grid.
    pub total_cells: usize,
    /// Cells with at least one placed object.
    pub occupied_cells: usize,
    /// Population of the fullest cell.
    pub max_cell_population: usize,
}

impl GridStats {
    /// Average population over occupied cells only.
    pub fn avg_per_occupied_cell(&self) -> f64 {
        if self.occupied_cells > 0 {
            self.placed_objects as f64 / self.occupied_cells as f64
        } else {
            0.0
        }
    }

    /// Fraction of cells with at least one object.
    pub fn occupancy(&self) -> f64 {
        if self.total_cells > 0 {
            self.occupied_cells as f64 / self.total_cells as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_avg_per_occupied_cell() {
        let stats = GridStats {
            tracked_objects: 10,
            placed_objects: 9,
            total_cells: 16,
            occupied_cells: 3,
            max_cell_population: 5,
        };
        assert_relative_eq!(stats.avg_per_occupied_cell(), 3.0);
        assert_relative_eq!(stats.occupancy(), 3.0 / 16.0);
    }

    #[test]
    fn test_empty_grid_has_zero_ratios() {
        let stats = GridStats::default();
        assert_eq!(stats.avg_per_occupied_cell(), 0.0);
        assert_eq!(stats.occupancy(), 0.0);
    }
}
