//! Simulation settings shared by every front end.

use serde::{Deserialize, Serialize};

use crate::{
    environment::{Environment, PopulateError, validate_ratios},
    strategy::StrategyKind,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("grid dimensions must be non-zero (got {width}x{height})")]
    ZeroSized { width: usize, height: usize },
    #[error(transparent)]
    Ratios(#[from] PopulateError),
}

/// Simulation configuration (TOML-friendly).
///
/// Missing fields fall back to a 10x5 grid with 12%
/// obstacles and 25% dirt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub width: usize,
    pub height: usize,
    pub obstacle_ratio: f64,
    pub dirt_ratio: f64,

    /// Seeds both map population and the random-path strategy. `None` is non-deterministic.
    pub seed: Option<u64>,

    pub strategy: StrategyKind,

    /// Pause after every rendered frame, in milliseconds. Display only.
    pub step_delay_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: 10,
            height: 5,
            obstacle_ratio: 0.12,
            dirt_ratio: 0.25,
            seed: None,
            strategy: StrategyKind::default(),
            step_delay_ms: 200,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::ZeroSized {
                width: self.width,
                height: self.height,
            });
        }
        validate_ratios(self.obstacle_ratio, self.dirt_ratio)?;
        Ok(())
    }

    /// Builds and randomly populates an environment of the configured size.
    pub fn build_environment(&self) -> Result<Environment, ConfigError> {
        self.validate()?;
        let mut environment = Environment::new(self.width, self.height);
        environment.populate_random(self.obstacle_ratio, self.dirt_ratio, self.seed)?;
        Ok(environment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Position;

    #[test]
    fn defaults_are_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.strategy, StrategyKind::CompleteCoverage);
    }

    #[test]
    fn rejects_zero_size_and_bad_ratios() {
        let flat = SimulationConfig {
            height: 0,
            ..SimulationConfig::default()
        };
        assert!(matches!(flat.validate(), Err(ConfigError::ZeroSized { .. })));

        let crowded = SimulationConfig {
            obstacle_ratio: 0.5,
            dirt_ratio: 0.5,
            ..SimulationConfig::default()
        };
        assert!(matches!(crowded.validate(), Err(ConfigError::Ratios(_))));
        assert!(crowded.build_environment().is_err());
    }

    #[test]
    fn builds_seeded_environment() {
        let config = SimulationConfig {
            seed: Some(9),
            ..SimulationConfig::default()
        };
        let a = config.build_environment().unwrap();
        let b = config.build_environment().unwrap();
        assert_eq!(a, b);
        assert_eq!((a.width(), a.height()), (10, 5));
        assert!(a.is_passable(Position::ORIGIN));
    }
}
