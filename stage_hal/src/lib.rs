//! # Stage HAL Library
//!
//! Positioner drivers behind the `PositionerHandle` trait defined in
//! `stage_common::hal::driver`.
//!
//! # Module Structure
//!
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Driver implementations
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                          stage_hal                             │
//! │  ┌───────────────────┐        ┌─────────────────────────────┐  │
//! │  │  DriverRegistry   │──────► │ PositionerHandle (trait obj) │  │
//! │  │  name → factory   │        │  simulation, ...            │  │
//! │  └───────────────────┘        └──────────────┬──────────────┘  │
//! │                                              │ DeviceMoved /   │
//! │                                              ▼ DeviceStopped   │
//! │                                        ┌───────────┐           │
//! │                                        │ EventBus  │           │
//! │                                        └───────────┘           │
//! └────────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod driver_registry;
pub mod drivers;

pub use crate::driver_registry::DriverRegistry;
pub use crate::drivers::simulation::SimulatedPositioner;
