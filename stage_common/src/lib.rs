//! Stage Common Library
//!
//! This crate provides the shared vocabulary of the stage motion workspace:
//! axes, travel limits, saved sites, the positioner driver interface, the
//! typed event bus and configuration loading utilities.
//!
//! # Module Structure
//!
//! - [`axis`] - Logical axis identifiers
//! - [`limits`] - Hard / soft travel limit pairs
//! - [`site`] - Saved stage positions and their line format
//! - [`events`] - Typed publish/subscribe bus
//! - [`hal`] - Positioner driver trait and configuration
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use stage_common::prelude::*;
//!
//! let limits = Limits::new(-50.0, 50.0) + Limits::new(-10_000.0, 10_000.0);
//! assert_eq!(limits, Limits::new(-10_050.0, 10_050.0));
//! assert_eq!("z".parse::<Axis>().unwrap(), Axis::Z);
//! ```

pub mod axis;
pub mod config;
pub mod consts;
pub mod events;
pub mod hal;
pub mod limits;
pub mod prelude;
pub mod site;
