//! Error type of the stage mover.

use stage_common::axis::Axis;
use stage_common::config::ConfigError;
use stage_common::hal::driver::PositionerError;
use stage_common::site::{SiteFormatError, SiteId, SiteParseError};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by stage motion, site and routing operations.
#[derive(Debug, Error)]
pub enum StageError {
    /// A position vector has the wrong number of coordinates.
    #[error("Asked to go to position with wrong number of axes ({got} != {expected})")]
    AxisCountMismatch {
        /// Coordinates required.
        expected: usize,
        /// Coordinates given.
        got: usize,
    },

    /// No positioner is configured for an axis.
    #[error("No positioner configured for axis {0}")]
    MissingAxis(Axis),

    /// The axis has no positioner at the requested control depth.
    #[error("Axis {axis} has no positioner at control depth {depth}")]
    NoHandlerAtDepth {
        /// Axis.
        axis: Axis,
        /// Control depth.
        depth: usize,
    },

    /// The same axis was given more than one target in a single move.
    #[error("Axis {0} given more than once in one move")]
    DuplicateAxis(Axis),

    /// A positioner did not report a stop in time.
    #[error("Timed out waiting for {device} to stop after {timeout:?}")]
    StopTimeout {
        /// Positioner name.
        device: String,
        /// Time waited.
        timeout: Duration,
    },

    /// Unknown site ID.
    #[error("No site with ID {0}")]
    SiteNotFound(SiteId),

    /// A positioner rejected a command.
    #[error(transparent)]
    Positioner(#[from] PositionerError),

    /// A line of a sites file could not be parsed.
    #[error("Sites file line {line}: {source}")]
    SiteParse {
        /// 1-based line number.
        line: usize,
        /// Parse failure.
        source: SiteParseError,
    },

    /// A site cannot be written in the line format.
    #[error(transparent)]
    SiteFormat(#[from] SiteFormatError),

    /// Sites file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stage configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Positioners could not be built from configuration.
    #[error("Failed to create positioners: {0}")]
    Driver(PositionerError),

    /// Step sizes must be positive and finite.
    #[error("Invalid step size: {0}")]
    InvalidStepSize(f64),
}

/// Result alias for stage mover operations.
pub type StageResult<T> = Result<T, StageError>;
