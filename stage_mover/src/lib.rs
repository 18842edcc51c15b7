//! # Stage Mover
//!
//! Coordinates microscope stage motion over stacked positioners.
//!
//! Each logical axis (X, Y, Z) may be driven by several positioners, for
//! example a long-travel motor stage carrying a short-travel piezo. The stage
//! position on an axis is the sum of its positioners, the limits are the sums
//! of their limits, and moves go to the positioner at the current *control
//! depth* with the others treated as a fixed offset.
//!
//! # Module Structure
//!
//! - [`registry`] - Per-axis positioner stacks and limit aggregation
//! - [`motion`] - Moves, stop detection, control depth and step sizes
//! - [`step`] - 1-2-5 step size ladder
//! - [`stop`] - Stop latches for blocking moves
//! - [`sites`] - Saved positions and the sites file
//! - [`route`] - Site visit ordering
//! - [`mover`] - The [`StageMover`] facade
//! - [`config`] - Stage configuration
//! - [`error`] - Error type
//!
//! # Example
//!
//! ```rust
//! use stage_common::events::EventBus;
//! use stage_hal::DriverRegistry;
//! use stage_mover::{StageMover, load_config_from_str};
//!
//! let config = load_config_from_str(r#"
//! [[positioners]]
//! name = "x"
//! axis = "x"
//! hard_limits = [-100.0, 100.0]
//!
//! [[positioners]]
//! name = "y"
//! axis = "y"
//! hard_limits = [-100.0, 100.0]
//!
//! [[positioners]]
//! name = "z"
//! axis = "z"
//! hard_limits = [-100.0, 100.0]
//! "#).unwrap();
//!
//! let mover = StageMover::from_config(&config, &DriverRegistry::default(), EventBus::new()).unwrap();
//! mover.initialize();
//! mover.go_to(&[10.0, 20.0, 30.0], true).unwrap();
//! assert_eq!(mover.position().unwrap(), [10.0, 20.0, 30.0]);
//! ```

pub mod config;
pub mod error;
pub mod motion;
pub mod mover;
pub mod registry;
pub mod route;
pub mod sites;
pub mod step;
pub mod stop;

pub use crate::config::{StageConfig, load_config, load_config_from_str};
pub use crate::error::{StageError, StageResult};
pub use crate::motion::{MotionCoordinator, MotionSettings};
pub use crate::mover::{StageMover, StageSnapshot};
pub use crate::registry::AxisRegistry;
pub use crate::sites::SiteRegistry;
pub use crate::step::{sensible_next_step_size, sensible_previous_step_size};
