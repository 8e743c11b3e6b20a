//! Loading `SimulationConfig` from TOML and layering CLI overrides on top.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use robot_cleaner_core::config::SimulationConfig;

use crate::Args;

/// Load config from a TOML file, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<SimulationConfig> {
    let Some(path) = path else {
        return Ok(SimulationConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read config file {}", path.display()))?;
    parse_config(&raw).with_context(|| format!("parse config file {}", path.display()))
}

pub fn parse_config(raw: &str) -> Result<SimulationConfig> {
    let config: SimulationConfig = toml::from_str(raw)?;
    Ok(config)
}

/// Overrides config fields with whatever was passed on the command line, then validates.
pub fn apply_overrides(mut config: SimulationConfig, args: &Args) -> Result<SimulationConfig> {
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(ratio) = args.obstacle_ratio {
        config.obstacle_ratio = ratio;
    }
    if let Some(ratio) = args.dirt_ratio {
        config.dirt_ratio = ratio;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }
    if let Some(delay) = args.delay_ms {
        config.step_delay_ms = delay;
    }
    config.validate().context("invalid simulation config")?;
    Ok(config)
}
