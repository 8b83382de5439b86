//! GridView Simulator CLI
//!
//! Run deterministic grid-index stress scenarios with brute-force
//! cross-checking.

use clap::Parser;
use gridview_core::GridConfig;
use gridview_sim::scenarios::ScenarioId;
use gridview_sim::{ScenarioResult, ScenarioRunner};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// GridView deterministic simulation CLI
#[derive(Parser, Debug)]
#[command(name = "gridview-sim")]
#[command(about = "Run deterministic stress scenarios against the grid index", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of entities to simulate
    #[arg(short, long, default_value = "50")]
    entities: usize,

    /// Scenario to run (drift, churn, edge_runner, flash_mob, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Simulation duration in seconds per scenario
    #[arg(short, long, default_value = "10")]
    duration: f64,

    /// Path to a JSON grid configuration (defaults to the built-in world)
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            eprintln!("Available scenarios: drift, churn, edge_runner, flash_mob, all");
            std::process::exit(1);
        })]
    };

    // Load an externally supplied grid configuration, if any
    let config: Option<GridConfig> = args.config.as_deref().map(|path| {
        let text = std::fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("Error reading {}: {}", path, e);
            std::process::exit(1);
        });
        let config: GridConfig = serde_json::from_str(&text).unwrap_or_else(|e| {
            eprintln!("Error parsing {}: {}", path, e);
            std::process::exit(1);
        });
        if let Err(e) = config.validate() {
            eprintln!("Invalid grid configuration in {}: {}", path, e);
            std::process::exit(1);
        }
        config
    });

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    if !args.json {
        info!("GridView Simulator v0.1.0");
        info!(
            "scenarios={:?} seeds={} entities={} duration={}s",
            scenarios.iter().map(|s| s.name()).collect::<Vec<_>>(),
            args.seeds,
            args.entities,
            args.duration
        );
    }

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);

        let mut runner = ScenarioRunner::new(seed, args.entities).with_duration(args.duration);
        if let Some(config) = &config {
            runner = runner.with_config(config.clone());
        }

        for scenario in &scenarios {
            let result = runner.run(*scenario);

            if !args.json {
                if result.passed {
                    info!(
                        "✓ {} (seed={}) PASSED - {} queries checked",
                        scenario.name(),
                        seed,
                        result.queries_checked
                    );
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if !result.passed {
                failed_count += 1;
            }

            all_results.push(result);
        }
    }

    // Summary
    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "ticks": r.total_ticks,
                    "queries_checked": r.queries_checked,
                    "mismatches": r.mismatches,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to serialize summary: {}", e),
        }
    } else if failed_count == 0 {
        info!("All {} scenario runs passed", total);
    } else {
        error!("{}/{} scenario runs failed", failed_count, total);
        for result in &all_results {
            if !result.passed {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    if failed_count > 0 {
        std::process::exit(1);
    }
}
