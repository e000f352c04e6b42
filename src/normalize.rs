//! Raw source claims → canonical records.
//!
//! Total over its input: anything that cannot be resolved (timestamp,
//! direction, speed) is dropped, never forwarded and never an error.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use metrics::counter;

use crate::ingest::types::{RawDirection, RawRecord};
use crate::units::{compass_to_degrees, to_canonical_speed, wrap_degrees};

/// One source's claim about one instant, in canonical units (km/h, degrees).
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub timestamp: DateTime<Utc>,
    pub sustained_kmh: f64,
    pub gust_kmh: f64,
    /// Always in [0, 360).
    pub direction_deg: f64,
    pub source: String,
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Parse `s` as an absolute instant; naive strings are placed in `assume`.
fn parse_instant(s: &str, assume: &FixedOffset) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = parse_naive(s)?;
    assume
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Absolute instant for a record.
///
/// A non-blank `time_utc` wins and is not second-guessed: if it does not
/// parse, the record is unresolvable even when `time_local` is present.
pub fn resolve_timestamp(
    time_utc: Option<&str>,
    time_local: Option<&str>,
    offset: &FixedOffset,
) -> Option<DateTime<Utc>> {
    let utc = FixedOffset::east_opt(0)?;
    match time_utc.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => parse_instant(s, &utc),
        None => parse_instant(time_local?, offset),
    }
}

/// Explicit degrees first, then the compass label.
pub fn resolve_direction(dir: &RawDirection) -> Option<f64> {
    if let Some(deg) = dir.degrees {
        return (deg.is_finite() && deg >= 0.0).then(|| wrap_degrees(deg));
    }
    dir.compass.as_deref().and_then(compass_to_degrees)
}

fn valid_speed(v: f64) -> Option<f64> {
    (v.is_finite() && v >= 0.0).then_some(v)
}

pub fn normalize_record(raw: &RawRecord, offset: &FixedOffset) -> Option<NormalizedRecord> {
    let timestamp = resolve_timestamp(raw.time_utc.as_deref(), raw.time_local.as_deref(), offset)?;
    let direction_deg = resolve_direction(&raw.direction)?;

    let sustained_kmh = valid_speed(to_canonical_speed(raw.sustained.value, raw.sustained.unit))?;
    let gust = raw.gust.unwrap_or(raw.sustained);
    let gust_kmh = valid_speed(to_canonical_speed(gust.value, gust.unit))?;

    Some(NormalizedRecord {
        timestamp,
        sustained_kmh,
        gust_kmh,
        direction_deg,
        source: raw.source.clone(),
    })
}

/// Normalize a whole batch. Output order follows input order minus drops.
pub fn normalize_records(raw: &[RawRecord], offset: &FixedOffset) -> Vec<NormalizedRecord> {
    let out: Vec<NormalizedRecord> = raw
        .iter()
        .filter_map(|r| normalize_record(r, offset))
        .collect();

    let dropped = raw.len() - out.len();
    if dropped > 0 {
        counter!("fusion_records_dropped_total").increment(dropped as u64);
        tracing::debug!(target: "fusion", total = raw.len(), dropped, "malformed records dropped");
    }
    out
}
