//! Deterministic simulation harness for the GridView index.
//!
//! A seeded ground-truth [`Oracle`](oracle::Oracle) drives the grid through
//! its lifecycle feed while the [`ScenarioRunner`](runner::ScenarioRunner)
//! cross-checks every region query against brute force. Same seed, same
//! run, always.

pub mod oracle;
pub mod runner;
pub mod scenarios;

pub use oracle::{Oracle, SimEntity};
pub use runner::{ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
