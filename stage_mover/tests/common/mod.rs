//! Shared helpers for stage mover integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use stage_common::axis::Axis;
use stage_common::events::{EventBus, StageEvent, WeakEventBus};
use stage_common::hal::driver::{PositionerError, PositionerHandle};
use stage_common::limits::{LimitBound, Limits};
use stage_mover::{StageConfig, StageMover};
use std::sync::Arc;

/// Command received by a [`RecordingPositioner`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Absolute(f64),
    Relative(f64),
    SoftLimit(f64, LimitBound),
}

struct State {
    position: f64,
    soft: Limits,
    commands: Vec<Command>,
}

/// Positioner that records every command and reports stops immediately,
/// unless built with `silent`.
pub struct RecordingPositioner {
    name: String,
    axis: Axis,
    hard: Limits,
    silent: bool,
    state: Mutex<State>,
    bus: WeakEventBus,
}

impl RecordingPositioner {
    pub fn new(bus: &EventBus, name: &str, axis: Axis, hard: Limits, position: f64) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            axis,
            hard,
            silent: false,
            state: Mutex::new(State {
                position,
                soft: hard,
                commands: Vec::new(),
            }),
            bus: bus.downgrade(),
        })
    }

    /// Never publishes `DeviceStopped`.
    pub fn silent(bus: &EventBus, name: &str, axis: Axis, hard: Limits) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            axis,
            hard,
            silent: true,
            state: Mutex::new(State {
                position: 0.0,
                soft: hard,
                commands: Vec::new(),
            }),
            bus: bus.downgrade(),
        })
    }

    pub fn commands(&self) -> Vec<Command> {
        self.state.lock().commands.clone()
    }

    pub fn absolute_moves(&self) -> Vec<f64> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                Command::Absolute(target) => Some(target),
                _ => None,
            })
            .collect()
    }

    fn finish_move(&self, position: f64) {
        self.bus.publish(StageEvent::DeviceMoved {
            device: self.name.clone(),
            axis: self.axis,
            position,
        });
        if !self.silent {
            self.bus.publish(StageEvent::DeviceStopped {
                device: self.name.clone(),
            });
        }
    }
}

impl PositionerHandle for RecordingPositioner {
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
        {
            let mut state = self.state.lock();
            state.commands.push(Command::Absolute(target));
            state.position = target;
        }
        self.finish_move(target);
        Ok(())
    }

    fn move_relative(&self, delta: f64) -> Result<(), PositionerError> {
        let position = {
            let mut state = self.state.lock();
            state.commands.push(Command::Relative(delta));
            state.position += delta;
            state.position
        };
        self.finish_move(position);
        Ok(())
    }

    fn hard_limits(&self) -> Limits {
        self.hard
    }

    fn soft_limits(&self) -> Limits {
        self.state.lock().soft
    }

    fn set_soft_limit(&self, value: f64, bound: LimitBound) -> Result<(), PositionerError> {
        let hard = self.hard.bound(bound);
        let beyond = match bound {
            LimitBound::Min => value < hard,
            LimitBound::Max => value > hard,
        };
        if beyond {
            return Err(PositionerError::SoftLimitBeyondHard {
                device: self.name.clone(),
                bound,
                value,
                hard,
            });
        }
        let mut state = self.state.lock();
        state.commands.push(Command::SoftLimit(value, bound));
        state.soft = state.soft.with_bound(bound, value);
        Ok(())
    }
}

/// Initialized mover over the given positioners with default configuration.
pub fn mover_over(bus: &EventBus, handles: Vec<Arc<dyn PositionerHandle>>) -> StageMover {
    let mover = StageMover::new(handles, &StageConfig::default(), bus.clone()).unwrap();
    mover.initialize();
    mover
}

/// Every event published on `bus` from now on.
pub fn record(bus: &EventBus) -> Arc<Mutex<Vec<StageEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    bus.subscribe(move |event| sink.lock().push(event.clone()));
    seen
}
