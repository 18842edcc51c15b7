//! Keypad step sizes.
//!
//! Step sizes walk a 1-2-5 ladder (…, 0.5, 1, 2, 5, 10, 20, …) and are kept
//! per axis and control depth.

use stage_common::axis::Axis;
use stage_common::consts::NUM_AXES;

use crate::error::{StageError, StageResult};

const MANTISSAS: [f64; 3] = [1.0, 2.0, 5.0];

/// Relative tolerance for "already on the ladder".
const LADDER_EPSILON: f64 = 1e-9;

/// `mantissa · 10^exponent`, built so that it equals the decimal literal.
fn ladder_value(mantissa: f64, exponent: i32) -> f64 {
    if exponent >= 0 {
        mantissa * 10f64.powi(exponent)
    } else {
        mantissa / 10f64.powi(-exponent)
    }
}

/// Ladder values around `size`, ascending. Rungs that overflow to infinity
/// or underflow to zero are dropped, so the ladder ends inside the f64 range.
fn ladder_around(size: f64) -> impl Iterator<Item = f64> {
    let exponent = size.log10().floor() as i32;
    ((exponent - 1)..=(exponent + 2))
        .flat_map(|e| MANTISSAS.iter().map(move |&m| ladder_value(m, e)))
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// Smallest ladder value strictly greater than `size`.
///
/// Non-positive or non-finite input is returned unchanged, as is `size` at
/// the top of the ladder.
pub fn sensible_next_step_size(size: f64) -> f64 {
    if !(size.is_finite() && size > 0.0) {
        return size;
    }
    let floor = size * (1.0 + LADDER_EPSILON);
    ladder_around(size).find(|&v| v > floor).unwrap_or(size)
}

/// Largest ladder value strictly smaller than `size`.
///
/// Non-positive or non-finite input is returned unchanged, as is `size` at
/// the bottom of the ladder.
pub fn sensible_previous_step_size(size: f64) -> f64 {
    if !(size.is_finite() && size > 0.0) {
        return size;
    }
    let ceiling = size * (1.0 - LADDER_EPSILON);
    ladder_around(size)
        .filter(|&v| v < ceiling)
        .last()
        .unwrap_or(size)
}

/// Step size per (axis, control depth).
#[derive(Debug, Clone, PartialEq)]
pub struct StepTable {
    sizes: Vec<[f64; NUM_AXES]>,
}

impl StepTable {
    /// Table for `depths` control depths; `initial(depth)` seeds every axis.
    pub fn new(depths: usize, initial: impl Fn(usize) -> f64) -> Self {
        Self {
            sizes: (0..depths).map(|d| [initial(d); NUM_AXES]).collect(),
        }
    }

    /// Step size of an axis at a depth.
    pub fn get(&self, axis: Axis, depth: usize) -> Option<f64> {
        self.sizes.get(depth).map(|row| row[axis.index()])
    }

    /// Change a step size. Returns the previous value.
    ///
    /// # Errors
    /// `InvalidStepSize` unless `size` is positive and finite.
    pub fn set(&mut self, axis: Axis, depth: usize, size: f64) -> StageResult<Option<f64>> {
        if !(size.is_finite() && size > 0.0) {
            return Err(StageError::InvalidStepSize(size));
        }
        Ok(self
            .sizes
            .get_mut(depth)
            .map(|row| std::mem::replace(&mut row[axis.index()], size)))
    }

    /// Number of depths.
    pub fn depths(&self) -> usize {
        self.sizes.len()
    }
}
