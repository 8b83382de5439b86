//! The "SPACE" side of the grid: world geometry and cell storage.
//!
//! A fixed, axis-aligned world extent is projected onto two of the three
//! world axes and cut into a `columns x rows` array of cells. Each cell keeps
//! an intrusive doubly-linked list of object records threaded through a slot
//! arena, so membership changes are O(1) and records never move in memory.
//!
//! Positions outside the configured extent are clamped to the nearest edge
//! cell. They are never dropped and never index out of range.

use std::collections::HashSet;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Handle, ObjectType};

// ============================================================================
// AXES
// ============================================================================

/// One of the three world axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Extracts this axis' component from a world-space vector.
    #[inline]
    pub fn component(&self, v: &Vector3<f64>) -> f64 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Configuration errors. All are fatal at initialization: an engine is never
/// constructed from an invalid [`GridConfig`].
#[derive(Debug, Error)]
pub enum GridError {
    /// Grid resolution must be at least 1x1.
    #[error("grid resolution must be at least 1x1, got {columns}x{rows}")]
    InvalidResolution { columns: u32, rows: u32 },

    /// World extent on an active axis must be strictly positive.
    #[error("degenerate world bounds on axis {axis:?}: min {min} is not below max {max}")]
    DegenerateBounds { axis: Axis, min: f64, max: f64 },

    /// Primary and secondary axes must differ.
    #[error("primary and secondary grid axes must differ, both are {0:?}")]
    DuplicateAxes(Axis),
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Immutable grid configuration, supplied by an external loader before any
/// notification is processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// World minimum corner (default: (-1000, -1000, -1000))
    pub min_corner: Vector3<f64>,

    /// World maximum corner (default: (1000, 1000, 1000))
    pub max_corner: Vector3<f64>,

    /// World axis mapped to grid columns (default: X)
    pub primary_axis: Axis,

    /// World axis mapped to grid rows (default: Z, the ground plane)
    pub secondary_axis: Axis,

    /// Number of columns along the primary axis, >= 1 (default: 32)
    pub columns: u32,

    /// Number of rows along the secondary axis, >= 1 (default: 32)
    pub rows: u32,

    /// The attribute handle the grid treats as object position. Updates for
    /// any other attribute are ignored. (default: Handle(1))
    pub position_attribute: Handle,

    /// Object types the grid tracks. `None` tracks every type; an explicit
    /// empty set tracks nothing. (default: None)
    pub tracked_types: Option<HashSet<ObjectType>>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            min_corner: Vector3::new(-1000.0, -1000.0, -1000.0),
            max_corner: Vector3::new(1000.0, 1000.0, 1000.0),
            primary_axis: Axis::X,
            secondary_axis: Axis::Z,
            columns: 32,
            rows: 32,
            position_attribute: Handle(1),
            tracked_types: None,
        }
    }
}

impl GridConfig {
    /// Checks resolution, axis selection, and world extent.
    ///
    /// Rejects a non-positive extent on either active axis, which also
    /// covers NaN bounds.
    pub fn validate(&self) -> Result<(), GridError> {
        if self.columns == 0 || self.rows == 0 {
            return Err(GridError::InvalidResolution {
                columns: self.columns,
                rows: self.rows,
            });
        }

        if self.primary_axis == self.secondary_axis {
            return Err(GridError::DuplicateAxes(self.primary_axis));
        }

        for axis in [self.primary_axis, self.secondary_axis] {
            let min = axis.component(&self.min_corner);
            let max = axis.component(&self.max_corner);
            if !(max - min > 0.0) {
                return Err(GridError::DegenerateBounds { axis, min, max });
            }
        }

        Ok(())
    }

    /// Cell extent along the primary axis. Only meaningful after `validate`.
    pub fn primary_cell_size(&self) -> f64 {
        let extent = self.primary_axis.component(&self.max_corner)
            - self.primary_axis.component(&self.min_corner);
        extent / self.columns as f64
    }

    /// Cell extent along the secondary axis. Only meaningful after `validate`.
    pub fn secondary_cell_size(&self) -> f64 {
        let extent = self.secondary_axis.component(&self.max_corner)
            - self.secondary_axis.component(&self.min_corner);
        extent / self.rows as f64
    }

    /// Whether objects of `object_type` are tracked under this configuration.
    pub fn tracks_type(&self, object_type: &ObjectType) -> bool {
        match &self.tracked_types {
            None => true,
            Some(set) => set.contains(object_type),
        }
    }
}

// ============================================================================
// QUERY VOLUME
// ============================================================================

/// An axis-aligned world-space box used as a query's search space.
///
/// Containment is inclusive on all three axes: the grid only partitions two
/// of them, so the exact check against the full box is what keeps the third
/// axis honest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    min: Vector3<f64>,
    max: Vector3<f64>,
}

impl Volume {
    /// Builds a volume from two opposite corners, in any order.
    pub fn from_corners(a: Vector3<f64>, b: Vector3<f64>) -> Self {
        Self {
            min: a.inf(&b),
            max: a.sup(&b),
        }
    }

    /// Minimum corner.
    pub fn min(&self) -> Vector3<f64> {
        self.min
    }

    /// Maximum corner.
    pub fn max(&self) -> Vector3<f64> {
        self.max
    }

    /// Exact containment test on every axis.
    #[inline]
    pub fn contains(&self, point: &Vector3<f64>) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }
}

// ============================================================================
// OBJECT RECORD
// ============================================================================

/// Per-object state tracked by the index.
///
/// Records live in the [`CellGrid`] arena and are addressed by slot index.
/// The intrusive `prev`/`next` links are slot indices too, so relocation and
/// destruction never touch more than three slots.
#[derive(Debug)]
pub struct ObjectRecord {
    handle: Handle,
    object_type: ObjectType,
    position: Vector3<f64>,
    /// Index of the owning cell, or `None` while unplaced.
    cell: Option<usize>,
    prev: Option<usize>,
    next: Option<usize>,
}

impl ObjectRecord {
    fn new(handle: Handle, object_type: ObjectType) -> Self {
        Self {
            handle,
            object_type,
            position: Vector3::zeros(),
            cell: None,
            prev: None,
            next: None,
        }
    }

    /// The caller-supplied object handle.
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// The immutable type classification.
    pub fn object_type(&self) -> &ObjectType {
        &self.object_type
    }

    /// Last reported world-space position.
    pub fn position(&self) -> Vector3<f64> {
        self.position
    }

    /// Index of the cell currently holding this record, `None` if no
    /// position has ever been reported.
    pub fn cell(&self) -> Option<usize> {
        self.cell
    }
}

/// One grid cell: the head of its membership list.
#[derive(Debug, Clone, Copy, Default)]
struct Cell {
    head: Option<usize>,
}

// ============================================================================
// CELL GRID
// ============================================================================

/// Dense cell array plus the record arena it indexes into.
///
/// The linear cell index is row-major with stride `columns`:
/// `index = y * columns + x`.
#[derive(Debug)]
pub struct CellGrid {
    min_primary: f64,
    min_secondary: f64,
    primary_axis: Axis,
    secondary_axis: Axis,
    primary_cell_size: f64,
    secondary_cell_size: f64,
    columns: usize,
    rows: usize,

    cells: Vec<Cell>,
    slots: Vec<Option<ObjectRecord>>,
    free: Vec<usize>,
    live: usize,
    placed: usize,
}

impl CellGrid {
    /// Builds the cell array for a validated configuration.
    pub fn new(config: &GridConfig) -> Result<Self, GridError> {
        config.validate()?;

        let columns = config.columns as usize;
        let rows = config.rows as usize;

        Ok(Self {
            min_primary: config.primary_axis.component(&config.min_corner),
            min_secondary: config.secondary_axis.component(&config.min_corner),
            primary_axis: config.primary_axis,
            secondary_axis: config.secondary_axis,
            primary_cell_size: config.primary_cell_size(),
            secondary_cell_size: config.secondary_cell_size(),
            columns,
            rows,
            cells: vec![Cell::default(); columns * rows],
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            placed: 0,
        })
    }

    /// Number of columns.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Records currently alive in the arena.
    pub fn live_records(&self) -> usize {
        self.live
    }

    /// Records currently linked into some cell.
    pub fn placed_records(&self) -> usize {
        self.placed
    }

    // ------------------------------------------------------------------
    // Coordinate mapping
    // ------------------------------------------------------------------

    /// Maps a world-space point to unclamped integer cell coordinates,
    /// truncating toward negative infinity.
    #[inline]
    pub fn to_coord(&self, point: &Vector3<f64>) -> (i64, i64) {
        let px = self.primary_axis.component(point) - self.min_primary;
        let py = self.secondary_axis.component(point) - self.min_secondary;
        (
            (px / self.primary_cell_size).floor() as i64,
            (py / self.secondary_cell_size).floor() as i64,
        )
    }

    /// Clamps cell coordinates into range and combines them into the linear
    /// row-major index. The stride is the number of cells per row, i.e.
    /// `columns`.
    #[inline]
    pub fn clamp_coord(&self, x: i64, y: i64) -> usize {
        let cx = x.clamp(0, self.columns as i64 - 1) as usize;
        let cy = y.clamp(0, self.rows as i64 - 1) as usize;
        cy * self.columns + cx
    }

    /// Maps a world-space point straight to its clamped linear cell index.
    #[inline]
    pub fn cell_index(&self, point: &Vector3<f64>) -> usize {
        let (x, y) = self.to_coord(point);
        self.clamp_coord(x, y)
    }

    /// Clamped cell-coordinate rectangle covered by a volume, as
    /// `(x_min, y_min, x_max, y_max)`, all inclusive.
    pub fn coverage(&self, volume: &Volume) -> (usize, usize, usize, usize) {
        let (x0, y0) = self.to_coord(&volume.min());
        let (x1, y1) = self.to_coord(&volume.max());
        (
            x0.clamp(0, self.columns as i64 - 1) as usize,
            y0.clamp(0, self.rows as i64 - 1) as usize,
            x1.clamp(0, self.columns as i64 - 1) as usize,
            y1.clamp(0, self.rows as i64 - 1) as usize,
        )
    }

    // ------------------------------------------------------------------
    // Arena lifecycle
    // ------------------------------------------------------------------

    /// Allocates an unplaced record and returns its slot index.
    pub fn insert(&mut self, handle: Handle, object_type: ObjectType) -> usize {
        let record = ObjectRecord::new(handle, object_type);
        self.live += 1;
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(record);
                slot
            }
            None => {
                self.slots.push(Some(record));
                self.slots.len() - 1
            }
        }
    }

    /// Unlinks (if placed) and frees a record.
    pub fn remove(&mut self, slot: usize) {
        self.unlink(slot);
        if let Some(entry) = self.slots.get_mut(slot) {
            if entry.take().is_some() {
                self.live -= 1;
                self.free.push(slot);
            }
        }
    }

    /// Borrows a live record.
    pub fn record(&self, slot: usize) -> Option<&ObjectRecord> {
        self.slots.get(slot).and_then(|entry| entry.as_ref())
    }

    /// Updates a record's stored position. Does not touch cell membership.
    pub fn set_position(&mut self, slot: usize, position: Vector3<f64>) {
        if let Some(record) = self.slots.get_mut(slot).and_then(|e| e.as_mut()) {
            record.position = position;
        }
    }

    // ------------------------------------------------------------------
    // Intrusive membership lists
    // ------------------------------------------------------------------

    /// Moves a record to `cell`, splicing it out of its current list first.
    /// The record becomes the new head of the target cell's list.
    pub fn relink(&mut self, slot: usize, cell: usize) {
        self.unlink(slot);
        self.link_head(slot, cell);
    }

    /// Links an unplaced record at the head of a cell's list.
    fn link_head(&mut self, slot: usize, cell: usize) {
        if cell >= self.cells.len() || self.record(slot).is_none() {
            return;
        }

        let old_head = self.cells[cell].head;
        if let Some(head) = old_head {
            if let Some(head_record) = self.slots[head].as_mut() {
                head_record.prev = Some(slot);
            }
        }
        if let Some(record) = self.slots[slot].as_mut() {
            record.prev = None;
            record.next = old_head;
            record.cell = Some(cell);
        }
        self.cells[cell].head = Some(slot);
        self.placed += 1;
    }

    /// Splices a record out of its cell's list. No-op if unplaced.
    fn unlink(&mut self, slot: usize) {
        let (prev, next, cell) = match self.record(slot) {
            Some(record) => (record.prev, record.next, record.cell),
            None => return,
        };
        let cell = match cell {
            Some(cell) => cell,
            None => return,
        };

        match prev {
            Some(prev) => {
                if let Some(prev_record) = self.slots[prev].as_mut() {
                    prev_record.next = next;
                }
            }
            None => self.cells[cell].head = next,
        }
        if let Some(next) = next {
            if let Some(next_record) = self.slots[next].as_mut() {
                next_record.prev = prev;
            }
        }

        if let Some(record) = self.slots[slot].as_mut() {
            record.prev = None;
            record.next = None;
            record.cell = None;
        }
        self.placed -= 1;
    }

    /// Walks one cell's membership list head to tail, most recently linked
    /// record first.
    pub fn cell_members(&self, cell: usize) -> CellMembers<'_> {
        CellMembers {
            grid: self,
            next: self.cells.get(cell).and_then(|c| c.head),
        }
    }
}

/// Iterator over the records of a single cell.
pub struct CellMembers<'a> {
    grid: &'a CellGrid,
    next: Option<usize>,
}

impl<'a> Iterator for CellMembers<'a> {
    type Item = &'a ObjectRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.next?;
        let record = self.grid.record(slot)?;
        self.next = record.next;
        Some(record)
    }
}

// ============================================================================
// TESTS
// ============================================================================
