//! Interchangeable cleaning algorithms.
//!
//! A strategy is a stateless selector: visited sets, stacks and RNGs live only for the duration
//! of one [`CleaningStrategy::clean`] call. Every strategy polls the cancellation token at each
//! loop head and before each step, and on cancellation returns with the robot and grid exactly
//! as the last completed step left them.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{agent::Robot, cancel::CancellationToken};

mod complete_coverage;
mod nearest_dirt;
mod random_path;
mod s_pattern;

pub use complete_coverage::CompleteCoverage;
pub use nearest_dirt::NearestDirt;
pub use random_path::RandomPath;
pub use s_pattern::SPattern;

/// Trait defining a cleaning algorithm.
/// Strategies drive the robot through its move and clean primitives.
pub trait CleaningStrategy: Send + Sync + fmt::Debug {
    /// Stable, kebab-case name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Cleans until no further reachable work exists or `cancel` fires.
    fn clean(&self, robot: &mut Robot, cancel: &CancellationToken);
}

/// Runtime selector over the built-in strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    #[default]
    CompleteCoverage,
    SPattern,
    RandomPath,
    NearestDirt,
}

impl StrategyKind {
    /// In menu order.
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::CompleteCoverage,
        StrategyKind::SPattern,
        StrategyKind::RandomPath,
        StrategyKind::NearestDirt,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::CompleteCoverage => "complete-coverage",
            StrategyKind::SPattern => "s-pattern",
            StrategyKind::RandomPath => "random-path",
            StrategyKind::NearestDirt => "nearest-dirt",
        }
    }

    /// Builds the strategy. `seed` only affects [`RandomPath`].
    pub fn build(self, seed: Option<u64>) -> Box<dyn CleaningStrategy> {
        match self {
            StrategyKind::CompleteCoverage => Box::new(CompleteCoverage),
            StrategyKind::SPattern => Box::new(SPattern),
            StrategyKind::RandomPath => Box::new(RandomPath { seed }),
            StrategyKind::NearestDirt => Box::new(NearestDirt),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown strategy '{0}' (expected complete-coverage, s-pattern, random-path or nearest-dirt)")]
pub struct UnknownStrategy(pub String);

impl FromStr for StrategyKind {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStrategy(s.to_string()))
    }
}
