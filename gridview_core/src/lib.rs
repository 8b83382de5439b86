//! GridView Core - Uniform-Grid Spatial Index for Moving Objects
//!
//! This library answers "which objects intersect this volume, optionally
//! filtered by type" without scanning the whole tracked population:
//! 1. **Space**: a fixed world extent projected onto two axes and cut into
//!    a dense `columns x rows` cell array with intrusive membership lists
//! 2. **Tracking**: an object lifecycle engine that keeps cell membership
//!    consistent as positions stream in
//! 3. **Observation**: a registration boundary for components interested in
//!    grid-relevant changes

pub mod gridview_observer;
pub mod gridview_space;
pub mod gridview_tracking;
pub mod metrics;
pub mod types;

// Re-export key types for convenience
pub use gridview_observer::{GridObserver, ObserverRegistry};
pub use gridview_space::{Axis, CellGrid, GridConfig, GridError, ObjectRecord, Volume};
pub use gridview_tracking::{GridModule, ObjectGrid, ObjectObserver, TypeFilter};
pub use metrics::GridStats;
pub use types::{Handle, Locality, ObjectType};
