//! Positioner configuration types.
//!
//! One `[[positioners]]` table per device-axis pair:
//!
//! ```toml
//! [[positioners]]
//! name = "piezo-z"
//! driver = "simulation"
//! axis = "z"
//! hard_limits = [0.0, 100.0]
//! soft_limits = [5.0, 95.0]
//! position = 50.0
//! settle_ms = 20
//! ```

use crate::axis::Axis;
use crate::hal::driver::PositionerError;
use crate::limits::Limits;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default function for driver
fn default_driver() -> String {
    "simulation".to_string()
}

/// Configuration of a single positioner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionerConfig {
    /// Unique positioner name.
    pub name: String,

    /// Driver that implements this positioner.
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Axis the positioner moves.
    pub axis: Axis,

    /// Device capability range in microns.
    pub hard_limits: Limits,

    /// Initial soft limits; defaults to the hard limits.
    #[serde(default)]
    pub soft_limits: Option<Limits>,

    /// Initial position (simulation only).
    #[serde(default)]
    pub position: f64,

    /// Time a move takes to settle before the stop notification (simulation only).
    #[serde(default)]
    pub settle_ms: u64,
}

impl PositionerConfig {
    /// Minimal configuration with soft limits equal to hard limits.
    pub fn new(name: impl Into<String>, axis: Axis, hard_limits: Limits) -> Self {
        Self {
            name: name.into(),
            driver: default_driver(),
            axis,
            hard_limits,
            soft_limits: None,
            position: 0.0,
            settle_ms: 0,
        }
    }

    /// Effective soft limits.
    pub fn effective_soft_limits(&self) -> Limits {
        self.soft_limits.unwrap_or(self.hard_limits)
    }

    /// Validate the positioner configuration.
    ///
    /// # Validation Rules
    /// 1. `name` is not empty
    /// 2. hard limits are finite with `min < max`
    /// 3. soft limits, if given, are ordered and inside the hard limits
    pub fn validate(&self) -> Result<(), PositionerError> {
        if self.name.trim().is_empty() {
            return Err(PositionerError::ConfigError(
                "positioner name cannot be empty".to_string(),
            ));
        }

        let hard = self.hard_limits;
        if !(hard.min.is_finite() && hard.max.is_finite()) || hard.min >= hard.max {
            return Err(PositionerError::ConfigError(format!(
                "{}: hard limits [{}, {}] must be finite with min < max",
                self.name, hard.min, hard.max
            )));
        }

        if let Some(soft) = self.soft_limits {
            if soft.min > soft.max || !hard.encloses(&soft) {
                return Err(PositionerError::ConfigError(format!(
                    "{}: soft limits [{}, {}] outside hard limits [{}, {}]",
                    self.name, soft.min, soft.max, hard.min, hard.max
                )));
            }
        }

        Ok(())
    }
}

/// Validate a set of positioner configurations together.
///
/// Every entry must be valid on its own and names must be unique.
pub fn validate_positioners(configs: &[PositionerConfig]) -> Result<(), PositionerError> {
    let mut names = HashSet::new();
    for config in configs {
        config.validate()?;
        if !names.insert(config.name.as_str()) {
            return Err(PositionerError::ConfigError(format!(
                "Duplicate positioner name: {}",
                config.name
            )));
        }
    }
    Ok(())
}
