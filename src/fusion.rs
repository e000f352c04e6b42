//! # Fusion
//! Hourly weighted fusion of normalized records.
//!
//! Buckets by hour, weighted scalar mean for speeds, weighted circular mean
//! for direction, spread-based divergence flag. Records without a positive
//! weight do not contribute to anything (mean or spread).

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use metrics::gauge;
use std::collections::BTreeMap;

use crate::config::FusionConfig;
use crate::model::{FusionFlag, HourlyFusedRecord};
use crate::normalize::NormalizedRecord;
use crate::units::{degrees_to_qualitative_label, wrap_degrees};

pub const HOUR_LABEL_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Zero minutes, seconds and sub-seconds.
pub fn truncate_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_trunc(TimeDelta::hours(1)).unwrap_or(ts)
}

/// Weighted circular mean in degrees, normalized to [0, 360).
///
/// `None` when there is nothing to average or the vectors cancel out exactly.
pub fn circular_mean_deg(samples: &[(f64, f64)]) -> Option<f64> {
    let (mut sin_sum, mut cos_sum) = (0.0_f64, 0.0_f64);
    for &(deg, w) in samples {
        let r = deg.to_radians();
        sin_sum += r.sin() * w;
        cos_sum += r.cos() * w;
    }
    if sin_sum == 0.0 && cos_sum == 0.0 {
        return None;
    }
    Some(wrap_degrees(sin_sum.atan2(cos_sum).to_degrees()))
}

#[derive(Default)]
struct Bucket {
    weight: f64,
    sustained: f64,
    gust: f64,
    directions: Vec<(f64, f64)>,
    min_sustained: f64,
    max_sustained: f64,
    count: usize,
}

impl Bucket {
    fn add(&mut self, r: &NormalizedRecord, w: f64) {
        if self.count == 0 {
            self.min_sustained = r.sustained_kmh;
            self.max_sustained = r.sustained_kmh;
        } else {
            self.min_sustained = self.min_sustained.min(r.sustained_kmh);
            self.max_sustained = self.max_sustained.max(r.sustained_kmh);
        }
        self.weight += w;
        self.sustained += r.sustained_kmh * w;
        self.gust += r.gust_kmh * w;
        self.directions.push((r.direction_deg, w));
        self.count += 1;
    }
}

/// Fuse `records` into one row per weighted hour, ascending, restricted to
/// hours starting at or after `now`.
pub fn fuse_hourly(
    records: &[NormalizedRecord],
    cfg: &FusionConfig,
    now: DateTime<Utc>,
) -> Vec<HourlyFusedRecord> {
    let mut buckets: BTreeMap<DateTime<Utc>, Bucket> = BTreeMap::new();
    let mut skipped = 0usize;

    for r in records {
        let w = match cfg.weight_for_source(&r.source) {
            Some(w) if w.is_finite() && w > 0.0 => w,
            _ => {
                skipped += 1;
                continue;
            }
        };
        buckets
            .entry(truncate_to_hour(r.timestamp))
            .or_default()
            .add(r, w);
    }
    if skipped > 0 {
        tracing::debug!(target: "fusion", skipped, "records without a usable weight skipped");
    }

    let offset = cfg.offset();
    let mut out = Vec::with_capacity(buckets.len());
    for (hour_start, b) in buckets {
        if b.weight <= 0.0 {
            continue;
        }
        let sustained = b.sustained / b.weight;
        let gust = b.gust / b.weight;
        let direction = circular_mean_deg(&b.directions);

        let mut flags = Vec::new();
        if b.max_sustained - b.min_sustained > cfg.divergence_threshold_kmh {
            flags.push(FusionFlag::HighDivergence);
        }

        out.push(HourlyFusedRecord {
            hour: hour_start
                .with_timezone(&offset)
                .format(HOUR_LABEL_FORMAT)
                .to_string(),
            hour_start,
            sustained_kmh: sustained.round() as i64,
            gust_kmh: gust.round() as i64,
            direction_deg: direction.map_or(0, |d| (d.round() as i64).rem_euclid(360)),
            direction: degrees_to_qualitative_label(direction),
            flags,
            record_count: b.count,
        });
    }

    // Post-fusion cutoff.
    out.retain(|h| h.hour_start >= now);

    gauge!("fusion_hours_emitted").set(out.len() as f64);
    tracing::debug!(target: "fusion", hours = out.len(), "fused series ready");
    out
}
