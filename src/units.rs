//! # Units & Directions
//!
//! Pure conversions used by the normalizer and the fusion engine:
//! - speed units → km/h (the canonical unit),
//! - 16-point compass labels → degrees,
//! - degrees → 8-octant qualitative description.
//!
//! No I/O, no validation beyond what each function documents.

use serde::{Deserialize, Serialize};
use std::fmt;

const KNOTS_TO_KMH: f64 = 1.852;
const MS_TO_KMH: f64 = 3.6;

/// Speed unit as reported by a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedUnit {
    #[serde(rename = "knots", alias = "kt", alias = "kts", alias = "KNOTS")]
    Knots,
    #[serde(
        rename = "m/s",
        alias = "meters_per_second",
        alias = "mps",
        alias = "ms"
    )]
    MetersPerSecond,
    /// Canonical unit (km/h).
    #[serde(rename = "km/h", alias = "kmh", alias = "kph", alias = "KM/H")]
    Kmh,
}

/// Convert `value` in `unit` to km/h.
///
/// Linear, no clamping: negative input comes back negative.
pub fn to_canonical_speed(value: f64, unit: SpeedUnit) -> f64 {
    match unit {
        SpeedUnit::Knots => value * KNOTS_TO_KMH,
        SpeedUnit::MetersPerSecond => value * MS_TO_KMH,
        SpeedUnit::Kmh => value,
    }
}

const COMPASS_16: [(&str, f64); 16] = [
    ("N", 0.0),
    ("NNE", 22.5),
    ("NE", 45.0),
    ("ENE", 67.5),
    ("E", 90.0),
    ("ESE", 112.5),
    ("SE", 135.0),
    ("SSE", 157.5),
    ("S", 180.0),
    ("SSW", 202.5),
    ("SW", 225.0),
    ("WSW", 247.5),
    ("W", 270.0),
    ("WNW", 292.5),
    ("NW", 315.0),
    ("NNW", 337.5),
];

/// Resolve a compass-point label (case-insensitive, surrounding whitespace ignored).
///
/// Returns `None` for anything outside the 16 standard points so callers can
/// drop the record instead of failing.
pub fn compass_to_degrees(label: &str) -> Option<f64> {
    let key = label.trim();
    COMPASS_16
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|&(_, deg)| deg)
}

/// Qualitative description of where the wind comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionDescription {
    pub compass: String,
    pub meaning: String,
}

impl DirectionDescription {
    pub fn unresolved() -> Self {
        Self {
            compass: "NA".to_string(),
            meaning: "direction unavailable".to_string(),
        }
    }

    pub fn is_unresolved(&self) -> bool {
        self.compass == "NA"
    }
}

impl fmt::Display for DirectionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.compass, self.meaning)
    }
}

// Octants in N-aligned order; meanings describe the local effect at the coastal lagoon site.
const OCTANTS: [(&str, &str); 8] = [
    ("North", "land breeze from the mainland"),
    ("Northeast", "land breeze from the mainland"),
    ("East", "sea breeze onto the coast"),
    ("Southeast", "sea breeze onto the coast"),
    ("South", "wind off the lagoon toward town"),
    ("Southwest", "land breeze from the mainland"),
    ("West", "land breeze from the mainland"),
    ("Northwest", "land breeze from the mainland"),
];

/// Bucket degrees into one of 8 octants (45° each, centred on N, NE, ...).
///
/// `None`, non-finite or out-of-range input yields [`DirectionDescription::unresolved`].
pub fn degrees_to_qualitative_label(degrees: Option<f64>) -> DirectionDescription {
    let deg = match degrees {
        Some(d) if d.is_finite() && (0.0..=360.0).contains(&d) => d,
        _ => return DirectionDescription::unresolved(),
    };
    let index = ((deg / 45.0).round() as usize) % OCTANTS.len();
    let (compass, meaning) = OCTANTS[index];
    DirectionDescription {
        compass: compass.to_string(),
        meaning: meaning.to_string(),
    }
}

/// Wrap any finite angle into [0, 360).
pub fn wrap_degrees(deg: f64) -> f64 {
    let w = deg.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs due to rounding.
    if w >= 360.0 {
        0.0
    } else {
        w
    }
}
