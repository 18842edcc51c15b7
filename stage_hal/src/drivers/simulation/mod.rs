//! Simulation driver module.
//!
//! Software positioners for development and testing without physical
//! hardware.

mod positioner;

pub use positioner::SimulatedPositioner;

use stage_common::events::EventBus;
use stage_common::hal::config::PositionerConfig;
use stage_common::hal::driver::{PositionerError, PositionerHandle};
use std::sync::Arc;

/// Factory function to create a simulated positioner.
pub fn create_positioner(
    config: &PositionerConfig,
    bus: &EventBus,
) -> Result<Arc<dyn PositionerHandle>, PositionerError> {
    Ok(Arc::new(SimulatedPositioner::from_config(config, bus)?))
}
