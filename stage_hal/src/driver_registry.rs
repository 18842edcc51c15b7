//! Driver registry for positioner drivers.
//!
//! Provides a `DriverRegistry` struct for registering positioner factories
//! and building positioners from configuration. Constructor-injected, no
//! global state.

use stage_common::events::EventBus;
use stage_common::hal::config::{PositionerConfig, validate_positioners};
use stage_common::hal::driver::{PositionerError, PositionerFactory, PositionerHandle};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::drivers::register_all_drivers;

/// Registry of available positioner drivers.
pub struct DriverRegistry {
    factories: HashMap<&'static str, PositionerFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in driver.
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();
        register_all_drivers(&mut registry);
        registry
    }

    /// Register a driver factory.
    ///
    /// # Errors
    /// Returns `PositionerError::ConfigError` if the name is already taken.
    pub fn register(
        &mut self,
        name: &'static str,
        factory: PositionerFactory,
    ) -> Result<(), PositionerError> {
        if self.factories.contains_key(name) {
            return Err(PositionerError::ConfigError(format!(
                "Driver '{name}' is already registered"
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Get a driver factory by name.
    pub fn get_factory(&self, name: &str) -> Option<PositionerFactory> {
        self.factories.get(name).copied()
    }

    /// Build one positioner from its configuration.
    ///
    /// # Errors
    /// `DriverNotFound` for an unknown driver, or whatever the driver reports.
    pub fn create(
        &self,
        config: &PositionerConfig,
        bus: &EventBus,
    ) -> Result<Arc<dyn PositionerHandle>, PositionerError> {
        let factory = self
            .get_factory(&config.driver)
            .ok_or_else(|| PositionerError::DriverNotFound(config.driver.clone()))?;
        factory(config, bus)
    }

    /// Validate a full set of configurations, then build all positioners.
    pub fn create_all(
        &self,
        configs: &[PositionerConfig],
        bus: &EventBus,
    ) -> Result<Vec<Arc<dyn PositionerHandle>>, PositionerError> {
        validate_positioners(configs)?;
        let handles = configs
            .iter()
            .map(|config| self.create(config, bus))
            .collect::<Result<Vec<_>, _>>()?;
        info!("Created {} positioners", handles.len());
        Ok(handles)
    }

    /// List all registered driver names, sorted.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_builtin_drivers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stage_common::axis::Axis;
    use stage_common::limits::Limits;

    fn failing_factory(
        config: &PositionerConfig,
        _bus: &EventBus,
    ) -> Result<Arc<dyn PositionerHandle>, PositionerError> {
        Err(PositionerError::CommunicationError(format!(
            "{} is offline",
            config.name
        )))
    }

    #[test]
    fn registry_builtin_has_simulation() {
        let reg = DriverRegistry::with_builtin_drivers();
        assert_eq!(reg.list_drivers(), vec!["simulation"]);
    }

    #[test]
    fn registry_create_simulation() {
        let reg = DriverRegistry::with_builtin_drivers();
        let bus = EventBus::new();
        let config = PositionerConfig::new("stage-x", Axis::X, Limits::new(-10.0, 10.0));
        let handle = reg.create(&config, &bus).unwrap();
        assert_eq!(handle.name(), "stage-x");
        assert_eq!(handle.axis(), Axis::X);
    }

    #[test]
    fn registry_driver_not_found() {
        let reg = DriverRegistry::new();
        let bus = EventBus::new();
        let config = PositionerConfig::new("x", Axis::X, Limits::new(-1.0, 1.0));
        assert!(matches!(
            reg.create(&config, &bus),
            Err(PositionerError::DriverNotFound(_))
        ));
    }

    #[test]
    fn registry_duplicate_rejected() {
        let mut reg = DriverRegistry::new();
        reg.register("offline", failing_factory).unwrap();
        assert!(reg.register("offline", failing_factory).is_err());
    }

    #[test]
    fn registry_factory_error_propagates() {
        let mut reg = DriverRegistry::new();
        reg.register("offline", failing_factory).unwrap();
        let bus = EventBus::new();
        let mut config = PositionerConfig::new("x", Axis::X, Limits::new(-1.0, 1.0));
        config.driver = "offline".to_string();
        let err = reg.create_all(&[config], &bus).unwrap_err();
        assert!(err.to_string().contains("offline"));
    }
}
