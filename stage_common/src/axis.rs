//! Logical stage axes.
//!
//! Positioners, limits and step sizes are all keyed by [`Axis`]. Axis
//! identifiers coming from configuration files or the command line may be
//! written as `x`/`X`/`0`, `y`/`Y`/`1` or `z`/`Z`/`2`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::consts::NUM_AXES;

/// One of the three logical directions of stage travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Axis {
    /// Horizontal axis.
    X = 0,
    /// Vertical axis (in the sample plane).
    Y = 1,
    /// Focus axis.
    Z = 2,
}

/// Unknown axis identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown axis identifier '{0}' (expected x, y, z or 0, 1, 2)")]
pub struct ParseAxisError(pub String);

impl Axis {
    /// All axes in index order.
    pub const ALL: [Axis; NUM_AXES] = [Axis::X, Axis::Y, Axis::Z];

    /// Zero-based index (X = 0, Y = 1, Z = 2).
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Axis for a zero-based index.
    pub const fn from_index(index: usize) -> Option<Axis> {
        match index {
            0 => Some(Axis::X),
            1 => Some(Axis::Y),
            2 => Some(Axis::Z),
            _ => None,
        }
    }

    /// Lowercase letter name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        })
    }
}

impl FromStr for Axis {
    type Err = ParseAxisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" | "x" | "X" => Ok(Axis::X),
            "1" | "y" | "Y" => Ok(Axis::Y),
            "2" | "z" | "Z" => Ok(Axis::Z),
            other => Err(ParseAxisError(other.to_string())),
        }
    }
}

impl Serialize for Axis {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

struct AxisVisitor;

impl Visitor<'_> for AxisVisitor {
    type Value = Axis;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an axis name (x, y, z) or index (0, 1, 2)")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Axis, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Axis, E> {
        usize::try_from(v)
            .ok()
            .and_then(Axis::from_index)
            .ok_or_else(|| E::custom(ParseAxisError(v.to_string())))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Axis, E> {
        usize::try_from(v)
            .ok()
            .and_then(Axis::from_index)
            .ok_or_else(|| E::custom(ParseAxisError(v.to_string())))
    }
}

impl<'de> Deserialize<'de> for Axis {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AxisVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_all_identifier_forms() {
        for (text, axis) in [
            ("0", Axis::X),
            ("x", Axis::X),
            ("X", Axis::X),
            ("1", Axis::Y),
            ("y", Axis::Y),
            ("Y", Axis::Y),
            ("2", Axis::Z),
            ("z", Axis::Z),
            ("Z", Axis::Z),
        ] {
            assert_eq!(text.parse::<Axis>().unwrap(), axis, "parsing {text}");
        }
        assert!("w".parse::<Axis>().is_err());
        assert!("3".parse::<Axis>().is_err());
    }

    #[test]
    fn index_round_trip() {
        for axis in Axis::ALL {
            assert_eq!(Axis::from_index(axis.index()), Some(axis));
        }
        assert_eq!(Axis::from_index(3), None);
    }

    #[test]
    fn toml_accepts_letters_and_integers() {
        #[derive(Debug, Deserialize)]
        struct Wrapper {
            axis: Axis,
        }

        let w: Wrapper = toml::from_str("axis = \"Y\"").unwrap();
        assert_eq!(w.axis, Axis::Y);
        let w: Wrapper = toml::from_str("axis = 2").unwrap();
        assert_eq!(w.axis, Axis::Z);
        assert!(toml::from_str::<Wrapper>("axis = 7").is_err());
    }

    #[test]
    fn serializes_lowercase() {
        #[derive(Serialize)]
        struct Wrapper {
            axis: Axis,
        }
        let text = toml::to_string(&Wrapper { axis: Axis::X }).unwrap();
        assert!(text.contains("\"x\""));
    }
}
