//! The "TRACKING" side of the grid: object lifecycle and region queries.
//!
//! [`ObjectGrid`] consumes the object lifecycle feed (create, position
//! update, destroy) and keeps every tracked object's cell membership
//! consistent with its last reported position. Queries walk only the cells
//! covered by the search volume, so cost scales with local population, not
//! with the total number of tracked objects.
//!
//! The feed is event-driven and may deliver late or duplicate
//! notifications; lookup misses are therefore ignored rather than treated
//! as errors.

use std::collections::{HashMap, HashSet};

use nalgebra::Vector3;
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::gridview_observer::{GridObserver, ObserverRegistry};
use crate::gridview_space::{CellGrid, GridConfig, GridError, Volume};
use crate::metrics::GridStats;
use crate::types::{Handle, Locality, ObjectType};

// ============================================================================
// TYPE FILTER
// ============================================================================

/// Include/exclude filter over object types.
///
/// Exclusion wins: a type listed in both sets is filtered out.
#[derive(Debug, Clone, Default)]
pub struct TypeFilter {
    include: Option<HashSet<ObjectType>>,
    exclude: Option<HashSet<ObjectType>>,
}

impl TypeFilter {
    /// Matches every type.
    pub fn any() -> Self {
        Self::default()
    }

    /// Matches only the given types.
    pub fn include<I>(types: I) -> Self
    where
        I: IntoIterator<Item = ObjectType>,
    {
        Self {
            include: Some(types.into_iter().collect()),
            exclude: None,
        }
    }

    /// Matches everything except the given types.
    pub fn exclude<I>(types: I) -> Self
    where
        I: IntoIterator<Item = ObjectType>,
    {
        Self {
            include: None,
            exclude: Some(types.into_iter().collect()),
        }
    }

    /// Adds an exclusion set to an existing filter.
    pub fn and_exclude<I>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = ObjectType>,
    {
        self.exclude = Some(types.into_iter().collect());
        self
    }

    /// Applies the filter to one type.
    pub fn matches(&self, object_type: &ObjectType) -> bool {
        if let Some(exclude) = &self.exclude {
            if exclude.contains(object_type) {
                return false;
            }
        }
        match &self.include {
            Some(include) => include.contains(object_type),
            None => true,
        }
    }
}

// ============================================================================
// INTERFACES
// ============================================================================

/// Consumer side of the object lifecycle feed.
///
/// The host dispatch loop delivers notifications synchronously, in order,
/// on a single logical thread.
pub trait ObjectObserver {
    /// An object came into existence.
    fn create_object(
        &mut self,
        identity: Uuid,
        object: Handle,
        object_type: &ObjectType,
        locality: Locality,
    );

    /// An object ceased to exist.
    fn destroy_object(&mut self, identity: Uuid, object: Handle);

    /// An attribute of an object changed. Only the designated position
    /// attribute is meaningful to the grid; everything else is ignored.
    fn update_object_position(
        &mut self,
        identity: Uuid,
        object: Handle,
        attribute: Handle,
        value: Vector3<f64>,
        previous: Option<Vector3<f64>>,
    );
}

/// Query surface the grid module exposes to the rest of the system.
pub trait GridModule {
    /// All tracked, positioned objects whose position lies inside `volume`
    /// and whose type passes `filter`. Order is deterministic: covered
    /// cells in row-major order, most recently linked record first within
    /// each cell.
    fn find_objects(&self, volume: &Volume, filter: &TypeFilter) -> Vec<Handle>;

    /// Registers a grid observer. `false` on duplicate registration.
    fn register_observer(&mut self, observer: &dyn GridObserver) -> bool;

    /// Refreshes an observer's registration. `false` if not registered.
    fn update_observer(&mut self, observer: &dyn GridObserver) -> bool;

    /// Releases an observer. `false` if not registered.
    fn release_observer(&mut self, observer: &dyn GridObserver) -> bool;
}

// ============================================================================
// OBJECT GRID
// ============================================================================

/// The composed grid index engine.
///
/// Owns the cell store, the handle registry, and the observer registry.
/// Queries borrow `&self` and every mutation takes `&mut self`, so a cell
/// list can never be mutated while it is being traversed.
pub struct ObjectGrid {
    config: GridConfig,
    grid: CellGrid,

    /// Handle to arena slot. The single source of truth for "is this
    /// object tracked". Kept exactly in sync with arena lifetime.
    registry: HashMap<Handle, usize>,

    observers: ObserverRegistry,
}

impl ObjectGrid {
    /// Builds an engine from a validated configuration. Fails before any
    /// notification is processed if the configuration is unusable.
    pub fn new(config: GridConfig) -> Result<Self, GridError> {
        let grid = CellGrid::new(&config)?;
        info!(
            columns = config.columns,
            rows = config.rows,
            "object grid initialized"
        );
        Ok(Self {
            config,
            grid,
            registry: HashMap::new(),
            observers: ObserverRegistry::new(),
        })
    }

    /// The configuration this engine was built from.
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Whether the handle is currently tracked (created and not destroyed).
    pub fn is_tracked(&self, object: Handle) -> bool {
        self.registry.contains_key(&object)
    }

    /// Last reported position of a tracked object, `None` if the object is
    /// untracked or has never been positioned. Out-of-bounds positions are
    /// stored as reported, only the cell assignment is clamped.
    pub fn position_of(&self, object: Handle) -> Option<Vector3<f64>> {
        let slot = *self.registry.get(&object)?;
        let record = self.grid.record(slot)?;
        record.cell()?;
        Some(record.position())
    }

    /// Linear index of the cell holding the object, `None` if untracked or
    /// unplaced.
    pub fn cell_of(&self, object: Handle) -> Option<usize> {
        let slot = *self.registry.get(&object)?;
        self.grid.record(slot)?.cell()
    }

    /// Count of tracked objects, positioned or not.
    pub fn tracked_count(&self) -> usize {
        self.registry.len()
    }

    /// Count of tracked objects currently placed in a cell.
    pub fn placed_count(&self) -> usize {
        self.grid.placed_records()
    }

    /// Occupancy statistics, computed on demand.
    pub fn stats(&self) -> GridStats {
        let mut occupied_cells = 0;
        let mut max_cell_population = 0;
        for cell in 0..self.grid.cell_count() {
            let population = self.grid.cell_members(cell).count();
            if population > 0 {
                occupied_cells += 1;
                max_cell_population = max_cell_population.max(population);
            }
        }
        GridStats {
            tracked_objects: self.registry.len(),
            placed_objects: self.grid.placed_records(),
            total_cells: self.grid.cell_count(),
            occupied_cells,
            max_cell_population,
        }
    }
}

impl ObjectObserver for ObjectGrid {
    fn create_object(
        &mut self,
        _identity: Uuid,
        object: Handle,
        object_type: &ObjectType,
        _locality: Locality,
    ) {
        if !self.config.tracks_type(object_type) {
            trace!(%object, %object_type, "ignoring create for untracked type");
            return;
        }
        if self.registry.contains_key(&object) {
            debug!(%object, "duplicate create ignored");
            return;
        }

        let slot = self.grid.insert(object, object_type.clone());
        self.registry.insert(object, slot);
    }

    fn destroy_object(&mut self, _identity: Uuid, object: Handle) {
        // Absent handle is a no-op: destroy notifications may arrive for
        // objects the grid never tracked, or arrive twice.
        if let Some(slot) = self.registry.remove(&object) {
            self.grid.remove(slot);
        }
    }

    fn update_object_position(
        &mut self,
        _identity: Uuid,
        object: Handle,
        attribute: Handle,
        value: Vector3<f64>,
        _previous: Option<Vector3<f64>>,
    ) {
        if attribute != self.config.position_attribute {
            return;
        }
        let slot = match self.registry.get(&object) {
            Some(slot) => *slot,
            None => {
                trace!(%object, "position update for untracked object ignored");
                return;
            }
        };

        let target = self.grid.cell_index(&value);
        let current = self.grid.record(slot).and_then(|r| r.cell());
        // Relink only on a cell change; a same-cell update must not disturb
        // the record's place in its list.
        if current != Some(target) {
            self.grid.relink(slot, target);
        }
        self.grid.set_position(slot, value);
    }
}

impl GridModule for ObjectGrid {
    fn find_objects(&self, volume: &Volume, filter: &TypeFilter) -> Vec<Handle> {
        let mut found = Vec::new();
        let (x_min, y_min, x_max, y_max) = self.grid.coverage(volume);

        for y in y_min..=y_max {
            for x in x_min..=x_max {
                let cell = y * self.grid.columns() + x;
                for record in self.grid.cell_members(cell) {
                    if volume.contains(&record.position()) && filter.matches(record.object_type())
                    {
                        found.push(record.handle());
                    }
                }
            }
        }

        found
    }

    fn register_observer(&mut self, observer: &dyn GridObserver) -> bool {
        self.observers.register(observer)
    }

    fn update_observer(&mut self, observer: &dyn GridObserver) -> bool {
        self.observers.update(observer)
    }

    fn release_observer(&mut self, observer: &dyn GridObserver) -> bool {
        self.observers.release(observer)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gridview_space::Axis;

    fn test_config() -> GridConfig {
        // 4x4 cells of 25x25 over a (0,0)-(100,100) world on the X/Y plane.
        GridConfig {
            min_corner: Vector3::new(0.0, 0.0, 0.0),
            max_corner: Vector3::new(100.0, 100.0, 100.0),
            primary_axis: Axis::X,
            secondary_axis: Axis::Y,
            columns: 4,
            rows: 4,
            ..GridConfig::default()
        }
    }

    fn grid() -> ObjectGrid {
        ObjectGrid::new(test_config()).unwrap()
    }

    fn create(grid: &mut ObjectGrid, handle: u64, ty: &str) {
        grid.create_object(
            Uuid::new_v4(),
            Handle(handle),
            &ObjectType::from(ty),
            Locality::Local,
        );
    }

    fn move_to(grid: &mut ObjectGrid, handle: u64, x: f64, y: f64) {
        let attr = grid.config().position_attribute;
        grid.update_object_position(
            Uuid::new_v4(),
            Handle(handle),
            attr,
            Vector3::new(x, y, 0.0),
            None,
        );
    }

    fn volume(x0: f64, y0: f64, x1: f64, y1: f64) -> Volume {
        Volume::from_corners(Vector3::new(x0, y0, -100.0), Vector3::new(x1, y1, 100.0))
    }

    #[test]
    fn test_create_then_move_then_destroy() {
        let mut g = grid();
        create(&mut g, 1, "vehicle");
        assert!(g.is_tracked(Handle(1)));
        assert_eq!(g.placed_count(), 0);
        assert_eq!(g.position_of(Handle(1)), None);

        move_to(&mut g, 1, 10.0, 10.0);
        assert_eq!(g.cell_of(Handle(1)), Some(0));
        assert_eq!(g.placed_count(), 1);

        move_to(&mut g, 1, 60.0, 60.0);
        assert_eq!(g.cell_of(Handle(1)), Some(2 * 4 + 2));

        g.destroy_object(Uuid::new_v4(), Handle(1));
        assert!(!g.is_tracked(Handle(1)));
        assert_eq!(g.placed_count(), 0);
    }

    #[test]
    fn test_region_query_scenario() {
        let mut g = grid();
        create(&mut g, 1, "vehicle");
        move_to(&mut g, 1, 10.0, 10.0);

        move_to(&mut g, 1, 60.0, 60.0);
        assert!(
            g.find_objects(&volume(0.0, 0.0, 50.0, 50.0), &TypeFilter::any())
                .is_empty(),
            "object moved out of the lower-left quadrant"
        );
        assert_eq!(
            g.find_objects(&volume(50.0, 50.0, 100.0, 100.0), &TypeFilter::any()),
            vec![Handle(1)]
        );

        g.destroy_object(Uuid::new_v4(), Handle(1));
        assert!(g
            .find_objects(&volume(50.0, 50.0, 100.0, 100.0), &TypeFilter::any())
            .is_empty());
    }

    #[test]
    fn test_placed_count_matches_positioned_live_objects() {
        let mut g = grid();
        for handle in 1..=6u64 {
            create(&mut g, handle, "vehicle");
        }
        // Only four of the six ever get a position.
        for handle in 1..=4u64 {
            move_to(&mut g, handle, 10.0 * handle as f64, 10.0);
        }
        g.destroy_object(Uuid::new_v4(), Handle(2));

        assert_eq!(g.tracked_count(), 5);
        assert_eq!(g.placed_count(), 3);
        assert_eq!(
            g.find_objects(&volume(0.0, 0.0, 100.0, 100.0), &TypeFilter::any())
                .len(),
            3
        );
    }

    #[test]
    fn test_same_position_update_is_idempotent() {
        let mut g = grid();
        for handle in 1..=3u64 {
            create(&mut g, handle, "vehicle");
            move_to(&mut g, handle, 10.0, 10.0);
        }
        let before = g.find_objects(&volume(0.0, 0.0, 100.0, 100.0), &TypeFilter::any());
        assert_eq!(before, vec![Handle(3), Handle(2), Handle(1)]);

        // Re-reporting the same position must not relink or reorder.
        move_to(&mut g, 2, 10.0, 10.0);
        let after = g.find_objects(&volume(0.0, 0.0, 100.0, 100.0), &TypeFilter::any());
        assert_eq!(after, before);

        // A different position inside the same cell refreshes the position
        // without relinking either.
        move_to(&mut g, 2, 12.0, 14.0);
        let after = g.find_objects(&volume(0.0, 0.0, 100.0, 100.0), &TypeFilter::any());
        assert_eq!(after, before);
        assert_eq!(g.position_of(Handle(2)), Some(Vector3::new(12.0, 14.0, 0.0)));
    }

    #[test]
    fn test_full_world_query_order_is_deterministic() {
        let mut g = grid();
        create(&mut g, 1, "vehicle");
        create(&mut g, 2, "vehicle");
        create(&mut g, 3, "vehicle");
        create(&mut g, 4, "vehicle");
        move_to(&mut g, 1, 10.0, 10.0); // cell (0,0)
        move_to(&mut g, 2, 12.0, 10.0); // cell (0,0), linked after 1
        move_to(&mut g, 3, 30.0, 10.0); // cell (1,0)
        move_to(&mut g, 4, 10.0, 30.0); // cell (0,1)

        // Row-major cells, most recently linked first inside each cell.
        let found = g.find_objects(&volume(0.0, 0.0, 100.0, 100.0), &TypeFilter::any());
        assert_eq!(found, vec![Handle(2), Handle(1), Handle(3), Handle(4)]);

        // Relocating into an occupied cell puts the mover at its head.
        move_to(&mut g, 3, 14.0, 10.0);
        let found = g.find_objects(&volume(0.0, 0.0, 100.0, 100.0), &TypeFilter::any());
        assert_eq!(found, vec![Handle(3), Handle(2), Handle(1), Handle(4)]);
    }

    #[test]
    fn test_type_filters() {
        let mut g = grid();
        create(&mut g, 1, "vehicle");
        create(&mut g, 2, "drone");
        create(&mut g, 3, "pedestrian");
        for handle in 1..=3u64 {
            move_to(&mut g, handle, 10.0 * handle as f64, 10.0);
        }
        let world = volume(0.0, 0.0, 100.0, 100.0);

        let include = TypeFilter::include([ObjectType::from("drone")]);
        assert_eq!(g.find_objects(&world, &include), vec![Handle(2)]);

        let exclude = TypeFilter::exclude([ObjectType::from("drone")]);
        let found = g.find_objects(&world, &exclude);
        assert!(found.contains(&Handle(1)) && found.contains(&Handle(3)));
        assert!(!found.contains(&Handle(2)));
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let mut g = grid();
        create(&mut g, 1, "vehicle");
        create(&mut g, 2, "drone");
        move_to(&mut g, 1, 10.0, 10.0);
        move_to(&mut g, 2, 20.0, 10.0);

        let conflicted = TypeFilter::include([
            ObjectType::from("vehicle"),
            ObjectType::from("drone"),
        ])
        .and_exclude([ObjectType::from("drone")]);

        assert_eq!(
            g.find_objects(&volume(0.0, 0.0, 100.0, 100.0), &conflicted),
            vec![Handle(1)]
        );
    }

    #[test]
    fn test_untracked_type_is_ignored() {
        let config = GridConfig {
            tracked_types: Some([ObjectType::from("vehicle")].into_iter().collect()),
            ..test_config()
        };
        let mut g = ObjectGrid::new(config).unwrap();
        create(&mut g, 1, "vehicle");
        create(&mut g, 2, "drone");
        move_to(&mut g, 1, 10.0, 10.0);
        move_to(&mut g, 2, 10.0, 10.0);

        assert!(g.is_tracked(Handle(1)));
        assert!(!g.is_tracked(Handle(2)));
        assert_eq!(
            g.find_objects(&volume(0.0, 0.0, 100.0, 100.0), &TypeFilter::any()),
            vec![Handle(1)]
        );
    }

    #[test]
    fn test_update_before_create_is_ignored() {
        let mut g = grid();
        move_to(&mut g, 9, 10.0, 10.0);
        assert!(!g.is_tracked(Handle(9)));
        assert_eq!(g.placed_count(), 0);
    }

    #[test]
    fn test_double_destroy_is_noop() {
        let mut g = grid();
        create(&mut g, 1, "vehicle");
        move_to(&mut g, 1, 10.0, 10.0);
        g.destroy_object(Uuid::new_v4(), Handle(1));
        g.destroy_object(Uuid::new_v4(), Handle(1));
        assert_eq!(g.tracked_count(), 0);
        assert_eq!(g.placed_count(), 0);
    }

    #[test]
    fn test_other_attributes_are_ignored() {
        let mut g = grid();
        create(&mut g, 1, "vehicle");
        let other_attr = Handle(999);
        g.update_object_position(
            Uuid::new_v4(),
            Handle(1),
            other_attr,
            Vector3::new(10.0, 10.0, 0.0),
            None,
        );
        assert_eq!(g.placed_count(), 0);
        assert_eq!(g.position_of(Handle(1)), None);
    }

    #[test]
    fn test_out_of_bounds_position_clamps_to_edge_cell() {
        let mut g = grid();
        create(&mut g, 1, "vehicle");
        move_to(&mut g, 1, 150.0, -40.0);

        // Clamped to column 3, row 0; the true position is kept.
        assert_eq!(g.cell_of(Handle(1)), Some(3));
        assert_eq!(g.position_of(Handle(1)), Some(Vector3::new(150.0, -40.0, 0.0)));

        // The exact narrow-phase keeps it out of in-world queries but a
        // volume around the true position finds it.
        assert!(g
            .find_objects(&volume(0.0, 0.0, 100.0, 100.0), &TypeFilter::any())
            .is_empty());
        assert_eq!(
            g.find_objects(&volume(140.0, -50.0, 160.0, -30.0), &TypeFilter::any()),
            vec![Handle(1)]
        );
    }

    #[test]
    fn test_degenerate_volume_returns_empty() {
        let mut g = grid();
        create(&mut g, 1, "vehicle");
        move_to(&mut g, 1, 10.0, 10.0);

        let point = Volume::from_corners(
            Vector3::new(40.0, 40.0, 0.0),
            Vector3::new(40.0, 40.0, 0.0),
        );
        assert!(g.find_objects(&point, &TypeFilter::any()).is_empty());
    }

    #[test]
    fn test_third_axis_is_narrow_phase_checked() {
        let mut g = grid();
        create(&mut g, 1, "drone");
        let attr = g.config().position_attribute;
        g.update_object_position(
            Uuid::new_v4(),
            Handle(1),
            attr,
            Vector3::new(10.0, 10.0, 300.0),
            None,
        );

        // Same 2D cell, but the query volume caps the unpartitioned axis.
        let ground = Volume::from_corners(
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(100.0, 100.0, 50.0),
        );
        assert!(g.find_objects(&ground, &TypeFilter::any()).is_empty());

        let sky = Volume::from_corners(
            Vector3::new(0.0, 0.0, 250.0),
            Vector3::new(100.0, 100.0, 350.0),
        );
        assert_eq!(g.find_objects(&sky, &TypeFilter::any()), vec![Handle(1)]);
    }

    #[test]
    fn test_stats_reflect_occupancy() {
        let mut g = grid();
        for handle in 1..=5u64 {
            create(&mut g, handle, "vehicle");
        }
        move_to(&mut g, 1, 10.0, 10.0);
        move_to(&mut g, 2, 12.0, 12.0);
        move_to(&mut g, 3, 60.0, 60.0);

        let stats = g.stats();
        assert_eq!(stats.tracked_objects, 5);
        assert_eq!(stats.placed_objects, 3);
        assert_eq!(stats.total_cells, 16);
        assert_eq!(stats.occupied_cells, 2);
        assert_eq!(stats.max_cell_population, 2);
    }
}
