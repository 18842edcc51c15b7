//! Per-axis positioner stacks and limit aggregation.
//!
//! Every logical axis owns a stack of positioners, coarsest first. The stage
//! position on an axis is the sum of the stack's positions, and its hard and
//! soft limits are the component-wise sums of the stack's limits.

use stage_common::axis::Axis;
use stage_common::consts::NUM_AXES;
use stage_common::hal::driver::PositionerHandle;
use stage_common::limits::Limits;
use std::sync::Arc;
use tracing::info;

use crate::error::{StageError, StageResult};

/// Positioner stacks for X, Y and Z.
pub struct AxisRegistry {
    stacks: [Vec<Arc<dyn PositionerHandle>>; NUM_AXES],
}

impl AxisRegistry {
    /// Group positioners by axis and order each stack by descending
    /// hard-limit span. Equal spans keep their input order.
    ///
    /// # Errors
    /// `MissingAxis` if X, Y or Z ends up with no positioner.
    pub fn new(
        handles: impl IntoIterator<Item = Arc<dyn PositionerHandle>>,
    ) -> StageResult<Self> {
        let mut stacks: [Vec<Arc<dyn PositionerHandle>>; NUM_AXES] = Default::default();
        for handle in handles {
            stacks[handle.axis().index()].push(handle);
        }

        for axis in Axis::ALL {
            let stack = &mut stacks[axis.index()];
            if stack.is_empty() {
                return Err(StageError::MissingAxis(axis));
            }
            stack.sort_by(|a, b| b.hard_limits().span().total_cmp(&a.hard_limits().span()));
            info!(
                "Axis {}: {}",
                axis,
                stack.iter().map(|h| h.name()).collect::<Vec<_>>().join(" > ")
            );
        }

        Ok(Self { stacks })
    }

    /// Positioners of an axis, coarsest first.
    pub fn stack(&self, axis: Axis) -> &[Arc<dyn PositionerHandle>] {
        &self.stacks[axis.index()]
    }

    /// Positioner of an axis at a control depth.
    pub fn handler_at(&self, axis: Axis, depth: usize) -> Option<&Arc<dyn PositionerHandle>> {
        self.stacks[axis.index()].get(depth)
    }

    /// Number of positioners on an axis.
    pub fn depth_of(&self, axis: Axis) -> usize {
        self.stacks[axis.index()].len()
    }

    /// Deepest stack over all axes.
    pub fn max_depth(&self) -> usize {
        self.stacks.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Every positioner, axis by axis.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn PositionerHandle>> {
        self.stacks.iter().flatten()
    }

    /// Aggregate position of one axis.
    pub fn position_for_axis(&self, axis: Axis) -> StageResult<f64> {
        let mut total = 0.0;
        for handle in self.stack(axis) {
            total += handle.position()?;
        }
        Ok(total)
    }

    /// Aggregate position of all axes.
    pub fn position(&self) -> StageResult<[f64; NUM_AXES]> {
        Ok([
            self.position_for_axis(Axis::X)?,
            self.position_for_axis(Axis::Y)?,
            self.position_for_axis(Axis::Z)?,
        ])
    }

    /// Sum of the positions of every positioner on `axis` except the one at
    /// `depth`.
    pub fn offset_excluding(&self, axis: Axis, depth: usize) -> StageResult<f64> {
        let mut offset = 0.0;
        for (i, handle) in self.stack(axis).iter().enumerate() {
            if i != depth {
                offset += handle.position()?;
            }
        }
        Ok(offset)
    }

    /// One row per control depth with each axis' positioner position, `None`
    /// where the axis has no positioner at that depth.
    pub fn all_positions(&self) -> StageResult<Vec<[Option<f64>; NUM_AXES]>> {
        let mut rows = Vec::with_capacity(self.max_depth());
        for depth in 0..self.max_depth() {
            let mut row = [None; NUM_AXES];
            for axis in Axis::ALL {
                if let Some(handle) = self.handler_at(axis, depth) {
                    row[axis.index()] = Some(handle.position()?);
                }
            }
            rows.push(row);
        }
        Ok(rows)
    }

    /// Summed hard limits of one axis.
    pub fn hard_limits_for_axis(&self, axis: Axis) -> Limits {
        self.stack(axis).iter().map(|h| h.hard_limits()).sum()
    }

    /// Summed hard limits of every axis.
    pub fn hard_limits(&self) -> [Limits; NUM_AXES] {
        Axis::ALL.map(|axis| self.hard_limits_for_axis(axis))
    }

    /// Summed soft limits of one axis.
    pub fn soft_limits_for_axis(&self, axis: Axis) -> Limits {
        self.stack(axis).iter().map(|h| h.soft_limits()).sum()
    }

    /// Summed soft limits of every axis.
    pub fn soft_limits(&self) -> [Limits; NUM_AXES] {
        Axis::ALL.map(|axis| self.soft_limits_for_axis(axis))
    }

    /// Hard limits of each positioner on an axis, coarsest first.
    pub fn individual_hard_limits(&self, axis: Axis) -> Vec<Limits> {
        self.stack(axis).iter().map(|h| h.hard_limits()).collect()
    }

    /// Soft limits of each positioner on an axis, coarsest first.
    pub fn individual_soft_limits(&self, axis: Axis) -> Vec<Limits> {
        self.stack(axis).iter().map(|h| h.soft_limits()).collect()
    }
}

impl std::fmt::Debug for AxisRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("AxisRegistry");
        for axis in Axis::ALL {
            let names: Vec<&str> = self.stack(axis).iter().map(|h| h.name()).collect();
            s.field(axis.as_str(), &names);
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stage_common::events::EventBus;
    use stage_common::hal::config::PositionerConfig;
    use stage_hal::SimulatedPositioner;

    fn sim(
        bus: &EventBus,
        name: &str,
        axis: Axis,
        hard: (f64, f64),
        position: f64,
    ) -> Arc<dyn PositionerHandle> {
        let mut config = PositionerConfig::new(name, axis, Limits::from(hard));
        config.position = position;
        Arc::new(SimulatedPositioner::from_config(&config, bus).unwrap())
    }

    fn stage(bus: &EventBus) -> AxisRegistry {
        AxisRegistry::new(vec![
            sim(bus, "piezo-z", Axis::Z, (0.0, 100.0), 50.0),
            sim(bus, "stage-x", Axis::X, (-10_000.0, 10_000.0), 10.0),
            sim(bus, "stage-y", Axis::Y, (-10_000.0, 10_000.0), 20.0),
            sim(bus, "focus-z", Axis::Z, (-5_000.0, 5_000.0), 1_000.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_stacks_sorted_by_span() {
        let bus = EventBus::new();
        let reg = stage(&bus);
        let names: Vec<&str> = reg.stack(Axis::Z).iter().map(|h| h.name()).collect();
        assert_eq!(names, vec!["focus-z", "piezo-z"]);
        assert_eq!(reg.depth_of(Axis::X), 1);
        assert_eq!(reg.max_depth(), 2);
    }

    #[test]
    fn test_missing_axis() {
        let bus = EventBus::new();
        let err = AxisRegistry::new(vec![
            sim(&bus, "x", Axis::X, (-1.0, 1.0), 0.0),
            sim(&bus, "z", Axis::Z, (-1.0, 1.0), 0.0),
        ])
        .unwrap_err();
        assert!(matches!(err, StageError::MissingAxis(Axis::Y)));
    }

    #[test]
    fn test_positions_sum_per_axis() {
        let bus = EventBus::new();
        let reg = stage(&bus);
        assert_eq!(reg.position().unwrap(), [10.0, 20.0, 1_050.0]);
        assert_eq!(reg.offset_excluding(Axis::Z, 0).unwrap(), 50.0);
        assert_eq!(reg.offset_excluding(Axis::Z, 1).unwrap(), 1_000.0);
    }

    #[test]
    fn test_all_positions_uneven_depth() {
        let bus = EventBus::new();
        let reg = stage(&bus);
        let rows = reg.all_positions().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], [Some(10.0), Some(20.0), Some(1_000.0)]);
        assert_eq!(rows[1], [None, None, Some(50.0)]);
    }

    #[test]
    fn test_limits_aggregate() {
        let bus = EventBus::new();
        let reg = stage(&bus);
        assert_eq!(reg.hard_limits_for_axis(Axis::Z), Limits::new(-5_000.0, 5_100.0));
        assert_eq!(reg.soft_limits()[0], Limits::new(-10_000.0, 10_000.0));
        assert_eq!(
            reg.individual_hard_limits(Axis::Z),
            vec![Limits::new(-5_000.0, 5_000.0), Limits::new(0.0, 100.0)]
        );
    }

    #[test]
    fn test_hard_limit_sum_independent_of_input_order() {
        let bus = EventBus::new();
        let a = sim(&bus, "a", Axis::Z, (-3.5, 7.25), 0.0);
        let b = sim(&bus, "b", Axis::Z, (0.0, 100.0), 0.0);
        let c = sim(&bus, "c", Axis::Z, (-1_000.0, 1_000.0), 0.0);
        let x = sim(&bus, "x", Axis::X, (-1.0, 1.0), 0.0);
        let y = sim(&bus, "y", Axis::Y, (-1.0, 1.0), 0.0);

        let forward = AxisRegistry::new(vec![
            a.clone(),
            b.clone(),
            c.clone(),
            x.clone(),
            y.clone(),
        ])
        .unwrap();
        let backward = AxisRegistry::new(vec![y, x, c, b, a]).unwrap();
        assert_eq!(
            forward.hard_limits_for_axis(Axis::Z),
            backward.hard_limits_for_axis(Axis::Z)
        );
    }
}
