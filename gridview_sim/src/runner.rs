//! Scenario runner.
//!
//! Drives an [`ObjectGrid`] through its lifecycle feed, tick by tick, and
//! checks every region query and the placement invariant against the
//! oracle's ground truth.

use gridview_core::{
    Axis, GridConfig, GridModule, Handle, Locality, ObjectGrid, ObjectObserver, ObjectType,
    TypeFilter, Volume,
};
use nalgebra::Vector3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use crate::oracle::{Oracle, SimEntity};
use crate::scenarios::ScenarioId;

const TICK_RATE_HZ: u32 = 30;
const CHECK_INTERVAL_TICKS: u64 = 15;
const QUERIES_PER_CHECK: usize = 4;

const CLASSES: [&str; 3] = ["vehicle", "pedestrian", "drone"];

/// Outcome of one scenario run.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub scenario: ScenarioId,
    pub seed: u64,
    pub passed: bool,
    pub total_ticks: u64,
    pub queries_checked: usize,
    pub mismatches: usize,
    pub failure_reason: Option<String>,
}

/// Configures and executes scenario runs.
pub struct ScenarioRunner {
    seed: u64,
    entities: usize,
    duration_secs: f64,
    config: GridConfig,
}

impl ScenarioRunner {
    pub fn new(seed: u64, entities: usize) -> Self {
        Self {
            seed,
            entities,
            duration_secs: 10.0,
            config: Self::default_config(),
        }
    }

    /// 16x16 cells of 50m over an 800m square on the X/Y plane.
    pub fn default_config() -> GridConfig {
        GridConfig {
            min_corner: Vector3::new(-400.0, -400.0, -400.0),
            max_corner: Vector3::new(400.0, 400.0, 400.0),
            primary_axis: Axis::X,
            secondary_axis: Axis::Y,
            columns: 16,
            rows: 16,
            ..GridConfig::default()
        }
    }

    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_secs = secs;
        self
    }

    pub fn with_config(mut self, config: GridConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs one scenario to completion.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        let mut result = ScenarioResult {
            scenario,
            seed: self.seed,
            passed: false,
            total_ticks: 0,
            queries_checked: 0,
            mismatches: 0,
            failure_reason: None,
        };

        let mut grid = match ObjectGrid::new(self.config.clone()) {
            Ok(grid) => grid,
            Err(e) => {
                result.failure_reason = Some(format!("grid initialization failed: {}", e));
                return result;
            }
        };

        // Physics gets its own seed stream so the query pattern never
        // perturbs entity trajectories.
        let mut oracle = Oracle::new(self.seed.wrapping_mul(0x9e3779b97f4a7c15));
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        for _ in 0..self.entities {
            let handle = self.spawn_one(scenario, &mut oracle, &mut rng);
            if let Some(entity) = oracle.get(handle) {
                announce(&mut grid, self.config.position_attribute, entity);
            }
        }

        let dt = 1.0 / TICK_RATE_HZ as f64;
        let target_ticks = (self.duration_secs * TICK_RATE_HZ as f64) as u64;

        for tick in 0..target_ticks {
            if scenario == ScenarioId::Churn && rng.gen_bool(0.2) {
                self.churn_once(&mut grid, &mut oracle, &mut rng);
            }

            oracle.step(dt);
            if scenario != ScenarioId::EdgeRunner {
                // Keep the population inside the world so drift scenarios
                // exercise interior relocation, not just edge clamping.
                oracle.confine(self.config.min_corner, self.config.max_corner);
            }

            for handle in oracle.handles() {
                if let Some(entity) = oracle.get(handle) {
                    grid.update_object_position(
                        entity.identity,
                        entity.handle,
                        self.config.position_attribute,
                        entity.position,
                        None,
                    );
                }
            }

            if tick % CHECK_INTERVAL_TICKS == 0 {
                self.check_tick(&grid, &oracle, &mut rng, scenario, &mut result);
            }

            if tick % TICK_RATE_HZ as u64 == 0 {
                debug!(
                    "  t={:.1}s | entities={} | placed={}",
                    oracle.time(),
                    oracle.len(),
                    grid.placed_count()
                );
            }

            result.total_ticks = tick + 1;
        }

        result.passed = result.mismatches == 0 && result.failure_reason.is_none();
        result
    }

    /// Spawns one oracle entity with scenario-appropriate placement.
    fn spawn_one(
        &self,
        scenario: ScenarioId,
        oracle: &mut Oracle,
        rng: &mut ChaCha8Rng,
    ) -> Handle {
        let class = CLASSES[rng.gen_range(0..CLASSES.len())];
        let min = self.config.min_corner;
        let max = self.config.max_corner;

        let (position, velocity) = match scenario {
            ScenarioId::Drift | ScenarioId::Churn => (
                Vector3::new(
                    rng.gen_range(min.x * 0.95..max.x * 0.95),
                    rng.gen_range(min.y * 0.95..max.y * 0.95),
                    rng.gen_range(-50.0..50.0),
                ),
                Vector3::new(
                    rng.gen_range(-30.0..30.0),
                    rng.gen_range(-30.0..30.0),
                    0.0,
                ),
            ),
            ScenarioId::EdgeRunner => {
                let position = Vector3::new(
                    rng.gen_range(min.x * 0.9..max.x * 0.9),
                    rng.gen_range(min.y * 0.9..max.y * 0.9),
                    0.0,
                );
                // Point outward so entities leave the world and stay out.
                let velocity = Vector3::new(
                    position.x.signum() * rng.gen_range(40.0..80.0),
                    position.y.signum() * rng.gen_range(40.0..80.0),
                    0.0,
                );
                (position, velocity)
            }
            ScenarioId::FlashMob => (
                Vector3::new(
                    rng.gen_range(0.0..20.0),
                    rng.gen_range(0.0..20.0),
                    rng.gen_range(0.0..10.0),
                ),
                Vector3::new(rng.gen_range(-3.0..3.0), rng.gen_range(-3.0..3.0), 0.0),
            ),
        };

        oracle.spawn(position, velocity, class)
    }

    /// Destroys one random entity and spawns a replacement.
    fn churn_once(&self, grid: &mut ObjectGrid, oracle: &mut Oracle, rng: &mut ChaCha8Rng) {
        if let Some(handle) = oracle.random_handle() {
            if let Some(entity) = oracle.despawn(handle) {
                grid.destroy_object(entity.identity, entity.handle);
            }
        }
        let handle = self.spawn_one(ScenarioId::Churn, oracle, rng);
        if let Some(entity) = oracle.get(handle) {
            announce(grid, self.config.position_attribute, entity);
        }
    }

    /// Compares a batch of random queries against the oracle and checks the
    /// placement invariant.
    fn check_tick(
        &self,
        grid: &ObjectGrid,
        oracle: &Oracle,
        rng: &mut ChaCha8Rng,
        scenario: ScenarioId,
        result: &mut ScenarioResult,
    ) {
        let tracked_expected = oracle
            .entities()
            .filter(|e| self.config.tracks_type(&e.class))
            .count();
        if grid.placed_count() != tracked_expected {
            result.mismatches += 1;
            let reason = format!(
                "placement invariant broken at t={:.2}s: grid holds {} placed, oracle has {}",
                oracle.time(),
                grid.placed_count(),
                tracked_expected
            );
            warn!("{}", reason);
            result.failure_reason.get_or_insert(reason);
        }

        for _ in 0..QUERIES_PER_CHECK {
            let volume = self.random_volume(scenario, rng);
            let filter = random_filter(rng);

            let mut found = grid.find_objects(&volume, &filter);
            found.sort();

            let mut expected = oracle.brute_force_query(&volume, &filter);
            expected.retain(|h| {
                oracle
                    .get(*h)
                    .is_some_and(|e| self.config.tracks_type(&e.class))
            });

            result.queries_checked += 1;
            if found != expected {
                result.mismatches += 1;
                let reason = format!(
                    "query mismatch at t={:.2}s: grid returned {} handles, oracle {}",
                    oracle.time(),
                    found.len(),
                    expected.len()
                );
                warn!("{}", reason);
                result.failure_reason.get_or_insert(reason);
            }
        }
    }

    /// Picks a random query volume. Edge scenarios search well outside the
    /// world bounds, the rest stay around the interior.
    fn random_volume(&self, scenario: ScenarioId, rng: &mut ChaCha8Rng) -> Volume {
        let margin = match scenario {
            ScenarioId::EdgeRunner => 600.0,
            _ => 50.0,
        };
        let min = self.config.min_corner;
        let max = self.config.max_corner;

        let corner = |rng: &mut ChaCha8Rng| {
            Vector3::new(
                rng.gen_range(min.x - margin..max.x + margin),
                rng.gen_range(min.y - margin..max.y + margin),
                rng.gen_range(-200.0..200.0),
            )
        };
        Volume::from_corners(corner(rng), corner(rng))
    }
}

fn announce(grid: &mut ObjectGrid, position_attribute: Handle, entity: &SimEntity) {
    grid.create_object(
        entity.identity,
        entity.handle,
        &entity.class,
        Locality::Local,
    );
    grid.update_object_position(
        entity.identity,
        entity.handle,
        position_attribute,
        entity.position,
        None,
    );
}

fn random_filter(rng: &mut ChaCha8Rng) -> TypeFilter {
    let variant = rng.gen_range(0..4u8);
    let class = ObjectType::from(CLASSES[rng.gen_range(0..CLASSES.len())]);
    match variant {
        0 | 1 => TypeFilter::any(),
        2 => TypeFilter::include([class]),
        _ => TypeFilter::exclude([class]),
    }
}
