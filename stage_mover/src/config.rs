//! Stage configuration.
//!
//! One TOML file describes the service, motion tuning, site defaults and every
//! positioner:
//!
//! ```toml
//! [shared]
//! service_name = "stage-01"
//!
//! [motion]
//! min_movement = 0.3
//! blocking_move_timeout_ms = 30000
//! stop_wait_timeout_ms = 5000
//! step_sizes = [100.0, 1.0]
//!
//! [sites]
//! default_color = [0, 255, 0]
//! default_size = 25.0
//!
//! [[positioners]]
//! name = "stage-x"
//! axis = "x"
//! hard_limits = [-10000.0, 10000.0]
//! ```

use serde::{Deserialize, Serialize};
use stage_common::axis::Axis;
use stage_common::config::{ConfigError, ConfigLoader, SharedConfig};
use stage_common::consts::{
    DEFAULT_BLOCKING_MOVE_TIMEOUT, DEFAULT_SITE_COLOR, DEFAULT_SITE_SIZE, DEFAULT_STEP_SIZE,
    DEFAULT_STOP_WAIT_TIMEOUT, STAGE_MIN_MOVEMENT,
};
use stage_common::hal::config::{PositionerConfig, validate_positioners};
use std::path::Path;
use std::time::Duration;

fn default_min_movement() -> f64 {
    STAGE_MIN_MOVEMENT
}

fn default_blocking_move_timeout_ms() -> u64 {
    DEFAULT_BLOCKING_MOVE_TIMEOUT.as_millis() as u64
}

fn default_stop_wait_timeout_ms() -> u64 {
    DEFAULT_STOP_WAIT_TIMEOUT.as_millis() as u64
}

fn default_site_color() -> [u8; 3] {
    DEFAULT_SITE_COLOR
}

fn default_site_size() -> f64 {
    DEFAULT_SITE_SIZE
}

/// Motion tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Moves at or below this distance (µm) are not sent to the device.
    #[serde(default = "default_min_movement")]
    pub min_movement: f64,

    /// Per-positioner stop wait of a blocking move.
    #[serde(default = "default_blocking_move_timeout_ms")]
    pub blocking_move_timeout_ms: u64,

    /// Per-positioner wait of `wait_for_stop`.
    #[serde(default = "default_stop_wait_timeout_ms")]
    pub stop_wait_timeout_ms: u64,

    /// Initial keypad step size per control depth (µm).
    #[serde(default)]
    pub step_sizes: Vec<f64>,
}

impl MotionConfig {
    /// Blocking move timeout as a `Duration`.
    pub fn blocking_move_timeout(&self) -> Duration {
        Duration::from_millis(self.blocking_move_timeout_ms)
    }

    /// Stop wait timeout as a `Duration`.
    pub fn stop_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_wait_timeout_ms)
    }

    /// Initial step size for a control depth.
    ///
    /// Depths past the end of `step_sizes` reuse the last entry.
    pub fn step_size_for_depth(&self, depth: usize) -> f64 {
        self.step_sizes
            .get(depth)
            .or(self.step_sizes.last())
            .copied()
            .unwrap_or(DEFAULT_STEP_SIZE)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_movement.is_finite() && self.min_movement >= 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "motion.min_movement must be >= 0, got {}",
                self.min_movement
            )));
        }
        if self.blocking_move_timeout_ms == 0 || self.stop_wait_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "motion timeouts must be greater than zero".to_string(),
            ));
        }
        if let Some(bad) = self
            .step_sizes
            .iter()
            .find(|s| !(s.is_finite() && **s > 0.0))
        {
            return Err(ConfigError::ValidationError(format!(
                "motion.step_sizes must be positive, got {bad}"
            )));
        }
        Ok(())
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            min_movement: default_min_movement(),
            blocking_move_timeout_ms: default_blocking_move_timeout_ms(),
            stop_wait_timeout_ms: default_stop_wait_timeout_ms(),
            step_sizes: Vec::new(),
        }
    }
}

/// Defaults for newly created sites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitesConfig {
    /// Display colour (RGB).
    #[serde(default = "default_site_color")]
    pub default_color: [u8; 3],

    /// Display size.
    #[serde(default = "default_site_size")]
    pub default_size: f64,
}

impl Default for SitesConfig {
    fn default() -> Self {
        Self {
            default_color: default_site_color(),
            default_size: default_site_size(),
        }
    }
}

/// Complete stage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageConfig {
    /// Service identity and log level.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Motion tuning.
    #[serde(default)]
    pub motion: MotionConfig,

    /// Site defaults.
    #[serde(default)]
    pub sites: SitesConfig,

    /// Every positioner, in any order.
    #[serde(default)]
    pub positioners: Vec<PositionerConfig>,
}

impl StageConfig {
    /// Validate the whole configuration.
    ///
    /// # Validation Rules
    /// 1. `shared.service_name` is not blank
    /// 2. `min_movement >= 0`, timeouts > 0, step sizes > 0
    /// 3. site size > 0
    /// 4. every positioner is valid and names are unique
    /// 5. X, Y and Z each have at least one positioner
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.motion.validate()?;

        if !(self.sites.default_size.is_finite() && self.sites.default_size > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "sites.default_size must be positive, got {}",
                self.sites.default_size
            )));
        }

        validate_positioners(&self.positioners)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        for axis in Axis::ALL {
            if !self.positioners.iter().any(|p| p.axis == axis) {
                return Err(ConfigError::ValidationError(format!(
                    "no positioner configured for axis {axis}"
                )));
            }
        }
        Ok(())
    }

    /// Serialize back to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> Result<StageConfig, ConfigError> {
    let config = StageConfig::load(path)?;
    config.validate()?;
    Ok(config)
}

/// Parse and validate configuration text.
pub fn load_config_from_str(content: &str) -> Result<StageConfig, ConfigError> {
    let config = StageConfig::from_toml_str(content)?;
    config.validate()?;
    Ok(config)
}
