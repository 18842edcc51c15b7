//! Positioner driver interface and configuration.
//!
//! This module contains the trait every physical (or simulated) positioner
//! implements, and the configuration types used to construct them.

pub mod config;
pub mod driver;
