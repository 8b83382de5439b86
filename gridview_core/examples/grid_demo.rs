//! Minimal end-to-end walkthrough of the grid index.
//!
//! Builds a 4x4 grid over a 100x100 world, drives a few objects through
//! their lifecycle, and runs filtered region queries.
//!
//! Run: `cargo run --example grid_demo`

use gridview_core::{
    Axis, GridConfig, GridModule, Handle, Locality, ObjectGrid, ObjectObserver, ObjectType,
    TypeFilter, Volume,
};
use nalgebra::Vector3;
use uuid::Uuid;

fn main() -> Result<(), gridview_core::GridError> {
    let config = GridConfig {
        min_corner: Vector3::new(0.0, 0.0, 0.0),
        max_corner: Vector3::new(100.0, 100.0, 100.0),
        primary_axis: Axis::X,
        secondary_axis: Axis::Y,
        columns: 4,
        rows: 4,
        ..GridConfig::default()
    };
    let attr = config.position_attribute;
    let mut grid = ObjectGrid::new(config)?;

    // Two vehicles and a drone come into existence and report positions.
    for (handle, class, x, y, z) in [
        (1u64, "vehicle", 10.0, 10.0, 0.0),
        (2u64, "vehicle", 60.0, 60.0, 0.0),
        (3u64, "drone", 62.0, 58.0, 120.0),
    ] {
        grid.create_object(
            Uuid::new_v4(),
            Handle(handle),
            &ObjectType::from(class),
            Locality::Local,
        );
        grid.update_object_position(
            Uuid::new_v4(),
            Handle(handle),
            attr,
            Vector3::new(x, y, z),
            None,
        );
    }

    let upper_right = Volume::from_corners(
        Vector3::new(50.0, 50.0, 0.0),
        Vector3::new(100.0, 100.0, 200.0),
    );

    println!(
        "anything in the upper-right quadrant: {:?}",
        grid.find_objects(&upper_right, &TypeFilter::any())
    );
    println!(
        "vehicles only:                       {:?}",
        grid.find_objects(
            &upper_right,
            &TypeFilter::include([ObjectType::from("vehicle")])
        )
    );

    // Vehicle 1 drives into the upper-right quadrant.
    grid.update_object_position(
        Uuid::new_v4(),
        Handle(1),
        attr,
        Vector3::new(75.0, 75.0, 0.0),
        None,
    );
    println!(
        "after vehicle #1 moves:              {:?}",
        grid.find_objects(&upper_right, &TypeFilter::any())
    );

    println!("occupancy: {:?}", grid.stats());
    Ok(())
}
