//! Ground truth oracle for simulation.
//!
//! The Oracle maintains the "God's eye view" of the simulated world: the
//! true position, velocity, and class of every live entity. The grid under
//! test only ever sees the lifecycle notifications the runner derives from
//! it, and every grid query is checked against the oracle's brute-force
//! answer.

use std::collections::BTreeMap;

use gridview_core::{Handle, ObjectType, TypeFilter, Volume};
use nalgebra::Vector3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use uuid::Uuid;

/// A ground truth entity in the simulation.
#[derive(Debug, Clone)]
pub struct SimEntity {
    /// Runtime handle, also used as the grid key
    pub handle: Handle,

    /// External identity carried on lifecycle notifications
    pub identity: Uuid,

    /// Entity class (e.g. "vehicle", "pedestrian", "drone")
    pub class: ObjectType,

    /// True position [x, y, z] in meters
    pub position: Vector3<f64>,

    /// Velocity [vx, vy, vz] in m/s
    pub velocity: Vector3<f64>,
}

/// The Oracle: seeded ground truth plus reference queries.
pub struct Oracle {
    rng: ChaCha8Rng,
    jitter: Normal<f64>,

    // BTreeMap keeps iteration order stable across runs.
    entities: BTreeMap<Handle, SimEntity>,
    next_handle: u64,
    current_time: f64,
}

impl Oracle {
    /// Creates a new Oracle with the given physics seed.
    pub fn new(physics_seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(physics_seed),
            jitter: Normal::new(0.0, 0.15).expect("finite jitter std-dev"),
            entities: BTreeMap::new(),
            next_handle: 1,
            current_time: 0.0,
        }
    }

    /// Current simulation time in seconds.
    pub fn time(&self) -> f64 {
        self.current_time
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Live entity handles in ascending order.
    pub fn handles(&self) -> Vec<Handle> {
        self.entities.keys().copied().collect()
    }

    /// Iterates live entities in handle order.
    pub fn entities(&self) -> impl Iterator<Item = &SimEntity> {
        self.entities.values()
    }

    /// Spawns a new entity and returns its handle.
    pub fn spawn(
        &mut self,
        position: Vector3<f64>,
        velocity: Vector3<f64>,
        class: &str,
    ) -> Handle {
        let handle = Handle(self.next_handle);
        self.next_handle += 1;

        let identity = Uuid::from_bytes(self.rng.gen());
        self.entities.insert(
            handle,
            SimEntity {
                handle,
                identity,
                class: ObjectType::from(class),
                position,
                velocity,
            },
        );
        handle
    }

    /// Removes an entity. Returns the removed entity, if it was live.
    pub fn despawn(&mut self, handle: Handle) -> Option<SimEntity> {
        self.entities.remove(&handle)
    }

    /// Borrows a live entity by handle.
    pub fn get(&self, handle: Handle) -> Option<&SimEntity> {
        self.entities.get(&handle)
    }

    /// Picks a live entity uniformly at random.
    pub fn random_handle(&mut self) -> Option<Handle> {
        if self.entities.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..self.entities.len());
        self.entities.keys().nth(index).copied()
    }

    /// Advances every entity by one time step with a little measurement
    /// jitter on top of straight-line motion.
    pub fn step(&mut self, dt: f64) {
        self.current_time += dt;
        let mut noise = Vec::with_capacity(self.entities.len() * 2);
        for _ in 0..self.entities.len() {
            noise.push((
                self.jitter.sample(&mut self.rng),
                self.jitter.sample(&mut self.rng),
            ));
        }
        for (entity, (nx, ny)) in self.entities.values_mut().zip(noise) {
            entity.position += entity.velocity * dt + Vector3::new(nx, ny, 0.0);
        }
    }

    /// Reflects entities back inside the given bounds, flipping the
    /// offending velocity component.
    pub fn confine(&mut self, min: Vector3<f64>, max: Vector3<f64>) {
        for entity in self.entities.values_mut() {
            for axis in 0..3 {
                if entity.position[axis] < min[axis] {
                    entity.position[axis] = min[axis];
                    entity.velocity[axis] = entity.velocity[axis].abs();
                } else if entity.position[axis] > max[axis] {
                    entity.position[axis] = max[axis];
                    entity.velocity[axis] = -entity.velocity[axis].abs();
                }
            }
        }
    }

    /// Reference query: scans every live entity, in handle order.
    pub fn brute_force_query(&self, volume: &Volume, filter: &TypeFilter) -> Vec<Handle> {
        self.entities
            .values()
            .filter(|e| volume.contains(&e.position) && filter.matches(&e.class))
            .map(|e| e.handle)
            .collect()
    }
}
