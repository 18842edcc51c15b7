//! Motion coordination across stacked positioners.
//!
//! Moves are issued to the positioner at the current control depth; the other
//! positioners on the axis contribute a fixed offset. A move runs through
//!
//! ```text
//! Idle ──dispatch──► Dispatched ──(block)──► AwaitingStop ──stop/timeout──► Done
//!                        └──────────(no block)──────────────────────────────►┘
//! ```
//!
//! Every dispatch of a call happens before any wait, so coarse and fine
//! positioners move concurrently.

use parking_lot::{Mutex, RwLock};
use stage_common::axis::Axis;
use stage_common::consts::{
    DEFAULT_BLOCKING_MOVE_TIMEOUT, DEFAULT_STOP_WAIT_TIMEOUT, NUM_AXES, STAGE_MIN_MOVEMENT,
};
use stage_common::events::{EventBus, StageEvent};
use stage_common::hal::driver::PositionerHandle;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::MotionConfig;
use crate::error::{StageError, StageResult};
use crate::registry::AxisRegistry;
use crate::step::{StepTable, sensible_next_step_size, sensible_previous_step_size};
use crate::stop::{StopSignal, StopTracker};

/// Thresholds and timeouts of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSettings {
    /// Moves at or below this distance are skipped.
    pub min_movement: f64,
    /// Per-positioner wait of a blocking move.
    pub blocking_move_timeout: Duration,
    /// Per-positioner wait of [`MotionCoordinator::wait_for_stop`].
    pub stop_wait_timeout: Duration,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            min_movement: STAGE_MIN_MOVEMENT,
            blocking_move_timeout: DEFAULT_BLOCKING_MOVE_TIMEOUT,
            stop_wait_timeout: DEFAULT_STOP_WAIT_TIMEOUT,
        }
    }
}

impl From<&MotionConfig> for MotionSettings {
    fn from(config: &MotionConfig) -> Self {
        Self {
            min_movement: config.min_movement,
            blocking_move_timeout: config.blocking_move_timeout(),
            stop_wait_timeout: config.stop_wait_timeout(),
        }
    }
}

/// Issues moves, tracks stops, and owns control depth and step sizes.
#[derive(Debug)]
pub struct MotionCoordinator {
    registry: AxisRegistry,
    depth: Mutex<usize>,
    steps: RwLock<StepTable>,
    stops: StopTracker,
    settings: MotionSettings,
    bus: EventBus,
}

impl MotionCoordinator {
    /// Coordinator over `registry`, with step sizes seeded by `initial_step`.
    pub fn new(
        registry: AxisRegistry,
        settings: MotionSettings,
        initial_step: impl Fn(usize) -> f64,
        bus: EventBus,
    ) -> Self {
        let steps = StepTable::new(registry.max_depth(), initial_step);
        Self {
            registry,
            depth: Mutex::new(0),
            steps: RwLock::new(steps),
            stops: StopTracker::new(),
            settings,
            bus,
        }
    }

    /// The positioner stacks.
    pub fn registry(&self) -> &AxisRegistry {
        &self.registry
    }

    /// Stop signals, keyed by positioner name.
    pub fn stops(&self) -> &StopTracker {
        &self.stops
    }

    /// Active thresholds and timeouts.
    pub fn settings(&self) -> &MotionSettings {
        &self.settings
    }

    /// Index into each axis stack of the positioner under control.
    pub fn control_depth(&self) -> usize {
        *self.depth.lock()
    }

    /// Move all three axes to an absolute stage position.
    pub fn go_to(&self, position: &[f64], block: bool) -> StageResult<()> {
        check_len(position, NUM_AXES)?;
        let targets: Vec<(Axis, f64)> = Axis::ALL.into_iter().zip(position.iter().copied()).collect();
        self.go_to_axes(&targets, block)
    }

    /// Move X and Y only.
    pub fn go_to_xy(&self, position: &[f64], block: bool) -> StageResult<()> {
        check_len(position, 2)?;
        self.go_to_axes(&[(Axis::X, position[0]), (Axis::Y, position[1])], block)
    }

    /// Move Z only.
    pub fn go_to_z(&self, position: f64, block: bool) -> StageResult<()> {
        self.go_to_axes(&[(Axis::Z, position)], block)
    }

    /// Move by a delta. Axes with a zero delta are left alone.
    pub fn move_relative(&self, delta: &[f64], block: bool) -> StageResult<()> {
        check_len(delta, NUM_AXES)?;
        let current = self.registry.position()?;
        let targets: Vec<(Axis, f64)> = Axis::ALL
            .into_iter()
            .filter(|axis| delta[axis.index()] != 0.0)
            .map(|axis| (axis, current[axis.index()] + delta[axis.index()]))
            .collect();
        self.go_to_axes(&targets, block)
    }

    /// Move to absolute per-axis targets with the positioners at the current
    /// control depth.
    ///
    /// # Errors
    /// `DuplicateAxis` if an axis appears twice, `NoHandlerAtDepth` if an axis
    /// has no positioner at the depth. Both are reported before any move.
    pub fn go_to_axes(&self, targets: &[(Axis, f64)], block: bool) -> StageResult<()> {
        let depth = self.control_depth();

        let mut seen = [false; NUM_AXES];
        let mut plan = Vec::with_capacity(targets.len());
        for &(axis, target) in targets {
            if std::mem::replace(&mut seen[axis.index()], true) {
                return Err(StageError::DuplicateAxis(axis));
            }
            let handler = self
                .registry
                .handler_at(axis, depth)
                .ok_or(StageError::NoHandlerAtDepth { axis, depth })?;
            plan.push((axis, target, handler));
        }

        let mut armed = Vec::with_capacity(plan.len());
        for (axis, target, handler) in plan {
            let offset = self.registry.offset_excluding(axis, depth)?;
            let local = target - offset;
            let current = handler.position()?;
            if (current - local).abs() <= self.settings.min_movement {
                debug!("{}: already at {:.3}, skipping", handler.name(), local);
                continue;
            }

            debug!(
                "{}: {:.3} -> {:.3} (offset {:.3})",
                handler.name(),
                current,
                local,
                offset
            );
            let signal = self.stops.arm(handler.name());
            if let Err(e) = handler.move_absolute(local) {
                self.stops.disarm(handler.name());
                return Err(e.into());
            }
            armed.push((handler.name().to_string(), signal));
        }

        if block {
            self.await_signals(&armed, self.settings.blocking_move_timeout)?;
        }
        Ok(())
    }

    /// Wait for every armed signal; report the first timeout after all waits.
    fn await_signals(
        &self,
        armed: &[(String, Arc<StopSignal>)],
        timeout: Duration,
    ) -> StageResult<()> {
        let mut first_timeout = None;
        for (device, signal) in armed {
            if !signal.wait(timeout) {
                warn!("Failed waiting for {} to stop after {:?}", device, timeout);
                first_timeout.get_or_insert_with(|| StageError::StopTimeout {
                    device: device.clone(),
                    timeout,
                });
            }
        }
        first_timeout.map_or(Ok(()), Err)
    }

    /// Wait for every positioner ever commanded to report a stop.
    ///
    /// # Errors
    /// `StopTimeout` for the first positioner that does not stop in time.
    pub fn wait_for_stop(&self, timeout: Option<Duration>) -> StageResult<()> {
        let timeout = timeout.unwrap_or(self.settings.stop_wait_timeout);
        for (device, signal) in self.stops.snapshot() {
            if !signal.wait(timeout) {
                return Err(StageError::StopTimeout { device, timeout });
            }
        }
        Ok(())
    }

    /// Step each axis `multipliers[axis]` steps with the positioner at the
    /// current depth. Axes without a positioner at that depth are skipped.
    pub fn step(&self, multipliers: [i32; NUM_AXES]) -> StageResult<()> {
        let depth = self.control_depth();
        for axis in Axis::ALL {
            let multiplier = multipliers[axis.index()];
            if multiplier == 0 {
                continue;
            }
            let (Some(handler), Some(size)) = (
                self.registry.handler_at(axis, depth),
                self.steps.read().get(axis, depth),
            ) else {
                continue;
            };
            let delta = f64::from(multiplier) * size;
            debug!("{}: step {:+.3}", handler.name(), delta);
            self.stops.arm(handler.name());
            if let Err(e) = handler.move_relative(delta) {
                self.stops.disarm(handler.name());
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Hand control to the next depth, wrapping to the coarsest.
    pub fn change_mover(&self) {
        let max_depth = self.registry.max_depth();
        let (old, new) = {
            let mut depth = self.depth.lock();
            let old = *depth;
            *depth = (old + 1) % max_depth.max(1);
            (old, *depth)
        };
        if old == new {
            return;
        }

        info!("Control depth {} -> {}", old, new);
        self.bus.publish(StageEvent::StepIndexChanged { depth: new });

        let changed: Vec<(Axis, f64)> = {
            let steps = self.steps.read();
            Axis::ALL
                .into_iter()
                .filter(|&axis| self.registry.handler_at(axis, new).is_some())
                .filter_map(|axis| {
                    let step = steps.get(axis, new)?;
                    (steps.get(axis, old) != Some(step)).then_some((axis, step))
                })
                .collect()
        };
        for (axis, step) in changed {
            self.bus.publish(StageEvent::StepSizeChanged { axis, step });
        }
    }

    /// Walk the step size of every axis at the current depth one rung up
    /// (`direction > 0`) or down (`direction < 0`) the ladder.
    pub fn change_step_size(&self, direction: i32) -> StageResult<()> {
        if direction == 0 {
            return Ok(());
        }
        let depth = self.control_depth();
        let mut changed = Vec::with_capacity(NUM_AXES);
        {
            let mut steps = self.steps.write();
            for axis in Axis::ALL {
                if self.registry.handler_at(axis, depth).is_none() {
                    continue;
                }
                let Some(current) = steps.get(axis, depth) else {
                    continue;
                };
                let step = if direction > 0 {
                    sensible_next_step_size(current)
                } else {
                    sensible_previous_step_size(current)
                };
                steps.set(axis, depth, step)?;
                changed.push((axis, step));
            }
        }
        for (axis, step) in changed {
            self.bus.publish(StageEvent::StepSizeChanged { axis, step });
        }
        Ok(())
    }

    /// Set the step size of one axis at the current depth.
    pub fn set_step_size(&self, axis: Axis, step: f64) -> StageResult<()> {
        let depth = self.control_depth();
        if self.registry.handler_at(axis, depth).is_none() {
            return Err(StageError::NoHandlerAtDepth { axis, depth });
        }
        self.steps.write().set(axis, depth, step)?;
        self.bus.publish(StageEvent::StepSizeChanged { axis, step });
        Ok(())
    }

    /// Step size per axis at the current depth, `None` where the axis has no
    /// positioner at that depth.
    pub fn cur_step_sizes(&self) -> [Option<f64>; NUM_AXES] {
        let depth = self.control_depth();
        let steps = self.steps.read();
        Axis::ALL.map(|axis| {
            self.registry
                .handler_at(axis, depth)
                .and_then(|_| steps.get(axis, depth))
        })
    }

    /// Centre every fine positioner in its hard range and shift the coarse
    /// positioner the other way so the stage position is unchanged.
    pub fn recenter_fine_motion(&self) -> StageResult<()> {
        for axis in Axis::ALL {
            let stack = self.registry.stack(axis);
            let Some((coarse, fine)) = stack.split_first() else {
                continue;
            };
            if fine.is_empty() {
                continue;
            }

            let mut total_delta = 0.0;
            for handler in fine {
                let current = handler.position()?;
                let target = handler.hard_limits().midpoint();
                self.stops.arm(handler.name());
                handler.move_absolute(target)?;
                total_delta += target - current;
            }
            info!(
                "Recentered {} fine positioner(s) on {}, coarse by {:.3}",
                fine.len(),
                axis,
                -total_delta
            );
            self.stops.arm(coarse.name());
            coarse.move_relative(-total_delta)?;
        }
        Ok(())
    }

    /// Positioner at the current depth for an axis.
    pub fn current_handler(&self, axis: Axis) -> Option<&Arc<dyn PositionerHandle>> {
        self.registry.handler_at(axis, self.control_depth())
    }
}

fn check_len(values: &[f64], expected: usize) -> StageResult<()> {
    if values.len() != expected {
        return Err(StageError::AxisCountMismatch {
            expected,
            got: values.len(),
        });
    }
    Ok(())
}
