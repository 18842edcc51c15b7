//! Simulated single-axis positioner.
//!
//! Moves are instantaneous: the position jumps to the target and the stop
//! notification follows either on the calling thread (`settle_ms == 0`) or
//! from a short-lived settle thread.

use parking_lot::Mutex;
use stage_common::axis::Axis;
use stage_common::events::{EventBus, StageEvent, WeakEventBus};
use stage_common::hal::config::PositionerConfig;
use stage_common::hal::driver::{PositionerError, PositionerHandle};
use stage_common::limits::{LimitBound, Limits};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug)]
struct SimState {
    position: f64,
    soft_limits: Limits,
    move_count: u64,
}

/// Software positioner implementing [`PositionerHandle`].
#[derive(Debug)]
pub struct SimulatedPositioner {
    name: String,
    axis: Axis,
    hard_limits: Limits,
    settle: Duration,
    state: Mutex<SimState>,
    bus: WeakEventBus,
}

impl SimulatedPositioner {
    /// Build a positioner from its configuration.
    ///
    /// # Errors
    /// `ConfigError` if the configuration does not validate or the initial
    /// position lies outside the hard limits.
    pub fn from_config(config: &PositionerConfig, bus: &EventBus) -> Result<Self, PositionerError> {
        config.validate()?;
        if !config.hard_limits.contains(config.position) {
            return Err(PositionerError::ConfigError(format!(
                "{}: initial position {} outside hard limits",
                config.name, config.position
            )));
        }

        info!(
            "Simulated positioner {} on axis {} (hard [{}, {}])",
            config.name, config.axis, config.hard_limits.min, config.hard_limits.max
        );

        Ok(Self {
            name: config.name.clone(),
            axis: config.axis,
            hard_limits: config.hard_limits,
            settle: Duration::from_millis(config.settle_ms),
            state: Mutex::new(SimState {
                position: config.position,
                soft_limits: config.effective_soft_limits(),
                move_count: 0,
            }),
            bus: bus.downgrade(),
        })
    }

    /// Number of moves accepted so far.
    pub fn move_count(&self) -> u64 {
        self.state.lock().move_count
    }

    fn move_to(&self, target: f64) -> Result<(), PositionerError> {
        {
            let mut state = self.state.lock();
            if !state.soft_limits.contains(target) {
                return Err(PositionerError::OutsideSoftLimits {
                    device: self.name.clone(),
                    target,
                    limits: state.soft_limits,
                });
            }
            state.position = target;
            state.move_count += 1;
        }
        debug!("{} -> {:.3}", self.name, target);

        self.bus.publish(StageEvent::DeviceMoved {
            device: self.name.clone(),
            axis: self.axis,
            position: target,
        });
        self.notify_stopped()
    }

    fn notify_stopped(&self) -> Result<(), PositionerError> {
        let stopped = StageEvent::DeviceStopped {
            device: self.name.clone(),
        };
        if self.settle.is_zero() {
            self.bus.publish(stopped);
            return Ok(());
        }

        let bus = self.bus.clone();
        let settle = self.settle;
        thread::Builder::new()
            .name(format!("settle-{}", self.name))
            .spawn(move || {
                thread::sleep(settle);
                bus.publish(stopped);
            })
            .map(|_| ())
            .map_err(|e| PositionerError::CommunicationError(format!("settle thread: {e}")))
    }
}

impl PositionerHandle for SimulatedPositioner {
    fn name(&self) -> &str {
        &self.name
    }

    fn axis(&self) -> Axis {
        self.axis
    }

    fn position(&self) -> Result<f64, PositionerError> {
        Ok(self.state.lock().position)
    }

    fn move_absolute(&self, target: f64) -> Result<(), PositionerError> {
        self.move_to(target)
    }

    fn move_relative(&self, delta: f64) -> Result<(), PositionerError> {
        let target = self.state.lock().position + delta;
        self.move_to(target)
    }

    fn hard_limits(&self) -> Limits {
        self.hard_limits
    }

    fn soft_limits(&self) -> Limits {
        self.state.lock().soft_limits
    }

    fn set_soft_limit(&self, value: f64, bound: LimitBound) -> Result<(), PositionerError> {
        let hard = self.hard_limits.bound(bound);
        let beyond = match bound {
            LimitBound::Min => value < hard,
            LimitBound::Max => value > hard,
        };
        if beyond || !value.is_finite() {
            return Err(PositionerError::SoftLimitBeyondHard {
                device: self.name.clone(),
                bound,
                value,
                hard,
            });
        }
        let mut state = self.state.lock();
        state.soft_limits = state.soft_limits.with_bound(bound, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn piezo(bus: &EventBus, settle_ms: u64) -> SimulatedPositioner {
        let mut config = PositionerConfig::new("piezo-z", Axis::Z, Limits::new(0.0, 100.0));
        config.position = 50.0;
        config.settle_ms = settle_ms;
        SimulatedPositioner::from_config(&config, bus).unwrap()
    }

    #[test]
    fn test_move_absolute_and_relative() {
        let bus = EventBus::new();
        let p = piezo(&bus, 0);
        p.move_absolute(20.0).unwrap();
        assert_eq!(p.position().unwrap(), 20.0);
        p.move_relative(5.5).unwrap();
        assert_eq!(p.position().unwrap(), 25.5);
        assert_eq!(p.move_count(), 2);
    }

    #[test]
    fn test_move_outside_soft_limits_rejected() {
        let bus = EventBus::new();
        let p = piezo(&bus, 0);
        p.set_soft_limit(80.0, LimitBound::Max).unwrap();
        let err = p.move_absolute(90.0).unwrap_err();
        assert!(matches!(err, PositionerError::OutsideSoftLimits { .. }));
        assert_eq!(p.position().unwrap(), 50.0);
        assert_eq!(p.move_count(), 0);
    }

    #[test]
    fn test_soft_limit_beyond_hard_rejected() {
        let bus = EventBus::new();
        let p = piezo(&bus, 0);
        assert!(p.set_soft_limit(-1.0, LimitBound::Min).is_err());
        assert!(p.set_soft_limit(101.0, LimitBound::Max).is_err());
        p.set_soft_limit(10.0, LimitBound::Min).unwrap();
        assert_eq!(p.soft_limits(), Limits::new(10.0, 100.0));
    }

    #[test]
    fn test_immediate_notifications_in_order() {
        let bus = EventBus::new();
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        bus.subscribe(move |event| {
            let _ = tx.lock().send(event.kind());
        });
        let p = piezo(&bus, 0);
        p.move_absolute(10.0).unwrap();
        assert_eq!(rx.try_recv().unwrap(), "device_moved");
        assert_eq!(rx.try_recv().unwrap(), "device_stopped");
    }

    #[test]
    fn test_settle_thread_publishes_stop() {
        let bus = EventBus::new();
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        bus.subscribe(move |event| {
            if let StageEvent::DeviceStopped { device } = event {
                let _ = tx.lock().send(device.clone());
            }
        });
        let p = piezo(&bus, 10);
        p.move_absolute(10.0).unwrap();
        let device = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(device, "piezo-z");
    }

    #[test]
    fn test_initial_position_outside_hard_limits_rejected() {
        let bus = EventBus::new();
        let mut config = PositionerConfig::new("x", Axis::X, Limits::new(-1.0, 1.0));
        config.position = 5.0;
        assert!(SimulatedPositioner::from_config(&config, &bus).is_err());
    }
}
