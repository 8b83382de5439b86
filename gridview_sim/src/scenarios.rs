//! Stress scenarios for the grid index.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Steady motion across cell boundaries, relocation stress
    Drift,

    /// Continuous create/destroy while everything keeps moving
    Churn,

    /// Objects wander far outside the world bounds, clamping stress
    EdgeRunner,

    /// Dense cluster packed into a single cell
    FlashMob,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Drift,
            ScenarioId::Churn,
            ScenarioId::EdgeRunner,
            ScenarioId::FlashMob,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Drift => "drift",
            ScenarioId::Churn => "churn",
            ScenarioId::EdgeRunner => "edge_runner",
            ScenarioId::FlashMob => "flash_mob",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Drift => "entities drift across cell boundaries every few ticks",
            ScenarioId::Churn => "entities are created and destroyed continuously while moving",
            ScenarioId::EdgeRunner => "entities escape the world bounds and must clamp to edge cells",
            ScenarioId::FlashMob => "every entity crowds into one cell, then disperses",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drift" => Ok(ScenarioId::Drift),
            "churn" => Ok(ScenarioId::Churn),
            "edge_runner" | "edgerunner" => Ok(ScenarioId::EdgeRunner),
            "flash_mob" | "flashmob" => Ok(ScenarioId::FlashMob),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_scenarios_round_trip_through_names() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
        }
    }
}
