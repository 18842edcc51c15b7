//! Positioner driver implementations.
//!
//! - [`simulation`] - Software positioner for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement `PositionerHandle` from `stage_common::hal::driver`
//! 3. Register its factory in [`register_all_drivers`]

pub mod simulation;

use crate::driver_registry::DriverRegistry;

/// Register all built-in drivers on a registry.
pub fn register_all_drivers(registry: &mut DriverRegistry) {
    // Built-in names are distinct, registration cannot collide here.
    let _ = registry.register("simulation", simulation::create_positioner);
}
