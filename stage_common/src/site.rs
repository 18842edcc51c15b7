//! Saved stage positions ("sites") and their text line format.
//!
//! A sites file holds one site per line, no header:
//!
//! ```text
//! x,y,z,group,r,g,b,size,id
//! ```
//!
//! `group` is written as the literal `None` when the site has no group.
//! `size` is written with two decimals. Colour channels are accepted as any
//! decimal number in `0..=255` (older files store them as floats).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::consts::{DEFAULT_SITE_COLOR, DEFAULT_SITE_SIZE, NUM_AXES};

/// Unique site identifier.
pub type SiteId = u32;

/// Literal written in place of a missing group.
const NO_GROUP: &str = "None";

/// Number of comma separated fields in a site line.
const FIELD_COUNT: usize = 9;

/// Error parsing a site line.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SiteParseError {
    /// Line does not have exactly nine fields.
    #[error("expected 9 comma separated fields, found {0}")]
    FieldCount(usize),

    /// A numeric field could not be parsed or is not finite.
    #[error("field '{field}' is not a valid number: '{value}'")]
    BadNumber {
        /// Field name.
        field: &'static str,
        /// Offending text.
        value: String,
    },

    /// A colour channel is outside `0..=255`.
    #[error("colour channel '{field}' out of range: {value}")]
    ColorOutOfRange {
        /// Channel name.
        field: &'static str,
        /// Parsed value.
        value: f64,
    },
}

/// Error writing a site line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SiteFormatError {
    /// The group would break the line format or read back as no group.
    #[error("site {id}: group '{group}' cannot be written to a sites file")]
    UnwritableGroup {
        /// Site ID.
        id: SiteId,
        /// Group text.
        group: String,
    },
}

/// One saved 3D stage location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// Unique identifier, assigned by the site registry.
    pub id: SiteId,
    /// Aggregate stage position in microns.
    pub position: [f64; NUM_AXES],
    /// Optional grouping tag.
    pub group: Option<String>,
    /// Display colour (RGB).
    pub color: [u8; 3],
    /// Display size.
    pub size: f64,
}

impl Site {
    /// Create a site with default group, colour and size.
    pub fn new(id: SiteId, position: [f64; NUM_AXES]) -> Self {
        Self {
            id,
            position,
            group: None,
            color: DEFAULT_SITE_COLOR,
            size: DEFAULT_SITE_SIZE,
        }
    }

    /// Builder: set the group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Builder: set the colour.
    pub fn with_color(mut self, color: [u8; 3]) -> Self {
        self.color = color;
        self
    }

    /// Builder: set the display size.
    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    /// Serialize to one line of the sites file (no trailing newline).
    ///
    /// Groups containing a comma or line break, or spelled like the
    /// no-group marker, are rejected.
    pub fn to_line(&self) -> Result<String, SiteFormatError> {
        if let Some(group) = &self.group {
            if group == NO_GROUP || group.contains([',', '\n', '\r']) {
                return Err(SiteFormatError::UnwritableGroup {
                    id: self.id,
                    group: group.clone(),
                });
            }
        }
        Ok(self.to_string())
    }

    /// Parse one line of the sites file.
    pub fn parse_line(line: &str) -> Result<Site, SiteParseError> {
        let fields: Vec<&str> = line.trim_end_matches(['\n', '\r']).split(',').collect();
        if fields.len() != FIELD_COUNT {
            return Err(SiteParseError::FieldCount(fields.len()));
        }

        let x = parse_number("x", fields[0])?;
        let y = parse_number("y", fields[1])?;
        let z = parse_number("z", fields[2])?;
        let group = match fields[3] {
            NO_GROUP => None,
            g => Some(g.to_string()),
        };
        let color = [
            parse_channel("r", fields[4])?,
            parse_channel("g", fields[5])?,
            parse_channel("b", fields[6])?,
        ];
        let size = parse_number("size", fields[7])?;
        let id = fields[8]
            .trim()
            .parse::<SiteId>()
            .map_err(|_| SiteParseError::BadNumber {
                field: "id",
                value: fields[8].to_string(),
            })?;

        Ok(Site {
            id,
            position: [x, y, z],
            group,
            color,
            size,
        })
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x, y, z] = self.position;
        let [r, g, b] = self.color;
        write!(
            f,
            "{x},{y},{z},{},{r},{g},{b},{:.2},{}",
            self.group.as_deref().unwrap_or(NO_GROUP),
            self.size,
            self.id
        )
    }
}

impl FromStr for Site {
    type Err = SiteParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Site::parse_line(s)
    }
}

fn parse_number(field: &'static str, text: &str) -> Result<f64, SiteParseError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| SiteParseError::BadNumber {
            field,
            value: text.to_string(),
        })
}

fn parse_channel(field: &'static str, text: &str) -> Result<u8, SiteParseError> {
    let value = parse_number(field, text)?;
    if !(0.0..=255.0).contains(&value) {
        return Err(SiteParseError::ColorOutOfRange { field, value });
    }
    Ok(value.round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_round_trip_preserves_all_fields() {
        let site = Site::new(7, [100.5, -2.25, 3000.0])
            .with_group("well-A1")
            .with_color([12, 34, 56])
            .with_size(12.5);
        let line = site.to_line().unwrap();
        assert_eq!(line, "100.5,-2.25,3000,well-A1,12,34,56,12.50,7");

        let back = Site::parse_line(&line).unwrap();
        assert_eq!(back, site);
    }

    #[test]
    fn missing_group_is_written_as_none() {
        let site = Site::new(1, [0.0, 0.0, 0.0]);
        let line = site.to_line().unwrap();
        assert!(line.contains(",None,"));
        assert_eq!(Site::parse_line(&line).unwrap().group, None);
    }

    #[test]
    fn parses_float_colours_and_trailing_newline() {
        let site = Site::parse_line("1.0,2.0,3.0,None,0.0,255.0,0.0,25.00,4\n").unwrap();
        assert_eq!(site.position, [1.0, 2.0, 3.0]);
        assert_eq!(site.color, [0, 255, 0]);
        assert_eq!(site.size, 25.0);
        assert_eq!(site.id, 4);
    }

    #[test]
    fn parses_exponent_notation() {
        let site = Site::parse_line("1e-05,2,3,None,0,0,0,1.00,1").unwrap();
        assert_eq!(site.position[0], 0.00001);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(
            Site::parse_line("1,2,3,None,0,0,0,25"),
            Err(SiteParseError::FieldCount(8))
        );
        assert!(matches!(
            Site::parse_line("a,2,3,None,0,0,0,25,1"),
            Err(SiteParseError::BadNumber { field: "x", .. })
        ));
        assert!(matches!(
            Site::parse_line("1,2,3,None,0,300,0,25,1"),
            Err(SiteParseError::ColorOutOfRange { field: "g", .. })
        ));
        assert!(matches!(
            Site::parse_line("1,2,3,None,0,0,0,25,-1"),
            Err(SiteParseError::BadNumber { field: "id", .. })
        ));
    }

    #[test]
    fn group_with_comma_cannot_be_written() {
        let site = Site::new(3, [0.0; 3]).with_group("a,b");
        assert!(matches!(
            site.to_line(),
            Err(SiteFormatError::UnwritableGroup { id: 3, .. })
        ));
    }

    #[test]
    fn group_named_like_marker_cannot_be_written() {
        let site = Site::new(7, [0.0; 3]).with_group("None");
        assert_eq!(
            site.to_line(),
            Err(SiteFormatError::UnwritableGroup {
                id: 7,
                group: "None".to_string(),
            })
        );
        assert!(Site::new(7, [0.0; 3]).with_group("none").to_line().is_ok());
    }
}
