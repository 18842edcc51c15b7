//! Travel limits.
//!
//! Hard limits are fixed by the hardware; soft limits are user-adjustable
//! safety bounds that should stay inside the hard ones. Stacked positioners
//! on one axis add up: a ±10000 µm stage carrying a ±50 µm piezo gives a
//! combined range of ±10050 µm.

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::Add;

/// Which end of a limit pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitBound {
    /// Lower bound.
    Min,
    /// Upper bound.
    Max,
}

impl LimitBound {
    /// `true` for the upper bound.
    #[inline]
    pub const fn is_max(self) -> bool {
        matches!(self, LimitBound::Max)
    }
}

/// A `(min, max)` travel range in microns.
///
/// Serialized as a two element array, e.g. `hard_limits = [-100.0, 100.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Limits {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

impl Limits {
    /// Create a limit pair.
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Inclusive containment check.
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    /// Whether `other` lies entirely inside these limits.
    pub fn encloses(&self, other: &Limits) -> bool {
        self.min <= other.min && other.max <= self.max
    }

    /// Length of the range.
    #[inline]
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Centre of the range.
    #[inline]
    pub fn midpoint(&self) -> f64 {
        self.span() / 2.0 + self.min
    }

    /// One end of the range.
    #[inline]
    pub fn bound(&self, bound: LimitBound) -> f64 {
        match bound {
            LimitBound::Min => self.min,
            LimitBound::Max => self.max,
        }
    }

    /// Copy with one end replaced.
    pub fn with_bound(mut self, bound: LimitBound, value: f64) -> Self {
        match bound {
            LimitBound::Min => self.min = value,
            LimitBound::Max => self.max = value,
        }
        self
    }
}

impl From<(f64, f64)> for Limits {
    fn from((min, max): (f64, f64)) -> Self {
        Self { min, max }
    }
}

impl From<Limits> for (f64, f64) {
    fn from(limits: Limits) -> Self {
        (limits.min, limits.max)
    }
}

impl Add for Limits {
    type Output = Limits;

    fn add(self, rhs: Limits) -> Limits {
        Limits::new(self.min + rhs.min, self.max + rhs.max)
    }
}

impl Sum for Limits {
    fn sum<I: Iterator<Item = Limits>>(iter: I) -> Limits {
        iter.fold(Limits::default(), Add::add)
    }
}

impl<'a> Sum<&'a Limits> for Limits {
    fn sum<I: Iterator<Item = &'a Limits>>(iter: I) -> Limits {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_is_componentwise() {
        let stack = [Limits::new(-10_000.0, 10_000.0), Limits::new(-50.0, 50.0)];
        let total: Limits = stack.iter().sum();
        assert_eq!(total, Limits::new(-10_050.0, 10_050.0));
        let empty: Limits = std::iter::empty::<Limits>().sum();
        assert_eq!(empty, Limits::new(0.0, 0.0));
    }

    #[test]
    fn contains_is_inclusive() {
        let l = Limits::new(-1.0, 1.0);
        assert!(l.contains(-1.0));
        assert!(l.contains(1.0));
        assert!(!l.contains(1.0001));
    }

    #[test]
    fn midpoint_and_bounds() {
        let l = Limits::new(0.0, 100.0);
        assert_eq!(l.midpoint(), 50.0);
        assert_eq!(l.bound(LimitBound::Max), 100.0);
        assert_eq!(l.with_bound(LimitBound::Min, 10.0), Limits::new(10.0, 100.0));
        assert!(l.encloses(&Limits::new(10.0, 20.0)));
        assert!(!l.encloses(&Limits::new(-10.0, 20.0)));
    }

    #[test]
    fn toml_array_form() {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        struct Wrapper {
            hard_limits: Limits,
        }
        let w: Wrapper = toml::from_str("hard_limits = [-5.0, 5.0]").unwrap();
        assert_eq!(w.hard_limits, Limits::new(-5.0, 5.0));
        let text = toml::to_string(&w).unwrap();
        let back: Wrapper = toml::from_str(&text).unwrap();
        assert_eq!(back, w);
    }
}
