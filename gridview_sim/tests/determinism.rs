//! The harness must be fully deterministic: the same seed replays the same
//! world, and short runs of every scenario come up clean against brute
//! force.

use gridview_sim::{ScenarioId, ScenarioRunner};
use proptest::prelude::*;

fn quick_run(seed: u64, scenario: ScenarioId) -> (bool, u64, usize, usize) {
    let result = ScenarioRunner::new(seed, 20)
        .with_duration(2.0)
        .run(scenario);
    (
        result.passed,
        result.total_ticks,
        result.queries_checked,
        result.mismatches,
    )
}

#[test]
fn all_scenarios_pass_quick_runs() {
    for scenario in ScenarioId::all() {
        let (passed, _, queries, mismatches) = quick_run(42, scenario);
        assert!(
            passed,
            "{} failed with {} mismatches",
            scenario.name(),
            mismatches
        );
        assert!(queries > 0, "{} checked no queries", scenario.name());
    }
}

#[test]
fn same_seed_replays_identically() {
    for scenario in ScenarioId::all() {
        assert_eq!(
            quick_run(1234, scenario),
            quick_run(1234, scenario),
            "{} diverged between identical runs",
            scenario.name()
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn drift_holds_up_under_arbitrary_seeds(seed in 1u64..u64::MAX) {
        let (passed, _, _, mismatches) = quick_run(seed, ScenarioId::Drift);
        prop_assert!(passed, "seed {} produced {} mismatches", seed, mismatches);
    }
}
