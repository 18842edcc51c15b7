//! Prelude module for common re-exports.
//!
//! ```rust
//! use stage_common::prelude::*;
//! ```

// ─── Axes & limits ──────────────────────────────────────────────────
pub use crate::axis::{Axis, ParseAxisError};
pub use crate::limits::{LimitBound, Limits};

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::consts::{NUM_AXES, STAGE_MIN_MOVEMENT};

// ─── Events ─────────────────────────────────────────────────────────
pub use crate::events::{EventBus, StageEvent, SubscriptionId, WeakEventBus};

// ─── Positioners ────────────────────────────────────────────────────
pub use crate::hal::config::PositionerConfig;
pub use crate::hal::driver::{PositionerError, PositionerFactory, PositionerHandle};

// ─── Sites ──────────────────────────────────────────────────────────
pub use crate::site::{Site, SiteFormatError, SiteId, SiteParseError};
