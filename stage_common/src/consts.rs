//! System-wide constants for the stage workspace.
//!
//! Single source of truth for thresholds, timeouts and defaults.

use std::time::Duration;

/// Number of logical stage axes (X, Y, Z).
pub const NUM_AXES: usize = 3;

/// Moves smaller than this (in microns) are not sent to the device.
///
/// Must match the no-op threshold of the positioner drivers, otherwise a
/// move can be issued twice or wait forever for a stop that never comes.
pub const STAGE_MIN_MOVEMENT: f64 = 0.3;

/// How long a blocking move waits for each positioner to report a stop.
pub const DEFAULT_BLOCKING_MOVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for an explicit wait-for-stop.
pub const DEFAULT_STOP_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Keypad step size used when nothing is configured for a control depth (µm).
pub const DEFAULT_STEP_SIZE: f64 = 1.0;

/// Display colour of a new site (RGB).
pub const DEFAULT_SITE_COLOR: [u8; 3] = [0, 255, 0];

/// Display size of a new site.
pub const DEFAULT_SITE_SIZE: f64 = 25.0;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/stage/stage.toml";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_consistent() {
        assert_eq!(NUM_AXES, 3);
        assert!(STAGE_MIN_MOVEMENT > 0.0 && STAGE_MIN_MOVEMENT < 1.0);
        assert!(DEFAULT_STOP_WAIT_TIMEOUT < DEFAULT_BLOCKING_MOVE_TIMEOUT);
        assert!(DEFAULT_STEP_SIZE > 0.0);
        assert!(DEFAULT_SITE_SIZE > 0.0);
    }
}
