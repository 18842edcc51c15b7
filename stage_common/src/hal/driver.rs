//! Positioner trait and error types.
//!
//! This module defines:
//! - `PositionerHandle` trait - Interface for one device-axis pair
//! - `PositionerError` enum - Error types for positioner operations
//! - `PositionerFactory` type alias - Driver factory function type

use crate::axis::Axis;
use crate::events::EventBus;
use crate::hal::config::PositionerConfig;
use crate::limits::{LimitBound, Limits};
use std::sync::Arc;
use thiserror::Error;

/// Error types for positioner operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PositionerError {
    /// Requested target lies outside the soft limits.
    #[error("Tried to move {device} outside soft motion limits (target {target:.2}, limits [{:.2}, {:.2}])", .limits.min, .limits.max)]
    OutsideSoftLimits {
        /// Positioner name.
        device: String,
        /// Requested absolute target.
        target: f64,
        /// Soft limits at the time of the request.
        limits: Limits,
    },

    /// Requested soft limit lies beyond the hard limit.
    #[error("Soft {bound:?} limit {value} of {device} exceeds hard limit {hard}")]
    SoftLimitBeyondHard {
        /// Positioner name.
        device: String,
        /// Which end.
        bound: LimitBound,
        /// Requested value.
        value: f64,
        /// Hard limit at that end.
        hard: f64,
    },

    /// Positioner configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// No driver registered under the requested name.
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// Hardware communication error.
    #[error("Hardware communication error: {0}")]
    CommunicationError(String),
}

/// Factory function type for creating positioner instances.
///
/// The bus is handed to the driver so it can publish
/// `DeviceMoved` / `DeviceStopped` notifications.
pub type PositionerFactory =
    fn(&PositionerConfig, &EventBus) -> Result<Arc<dyn PositionerHandle>, PositionerError>;

/// One physical actuator moving along one axis.
///
/// Several positioners may share an axis (coarse stage + fine piezo); their
/// positions add up to the stage position on that axis. Implementations are
/// shared between threads, so every method takes `&self`.
///
/// # Notifications
///
/// A positioner publishes `StageEvent::DeviceStopped` with its `name()` once a
/// move has settled. Blocking moves in the stage mover wait for exactly that
/// event.
pub trait PositionerHandle: Send + Sync {
    /// Stable, unique name. Used as the key for stop tracking.
    fn name(&self) -> &str;

    /// Axis this positioner moves.
    fn axis(&self) -> Axis;

    /// Current position in microns.
    fn position(&self) -> Result<f64, PositionerError>;

    /// Move to an absolute position (this positioner's own frame).
    fn move_absolute(&self, target: f64) -> Result<(), PositionerError>;

    /// Move by a delta.
    fn move_relative(&self, delta: f64) -> Result<(), PositionerError>;

    /// Device capability range.
    fn hard_limits(&self) -> Limits;

    /// Current user safety range.
    fn soft_limits(&self) -> Limits;

    /// Change one end of the soft range.
    fn set_soft_limit(&self, value: f64, bound: LimitBound) -> Result<(), PositionerError>;
}

impl std::fmt::Debug for dyn PositionerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionerHandle")
            .field("name", &self.name())
            .field("axis", &self.axis())
            .finish()
    }
}
