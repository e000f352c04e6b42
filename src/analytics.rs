//! # Analytics
//! Near-term window over the fused series: confidence-gated average plus
//! peak and calm call-outs.
//!
//! The fused series is already ascending, so every scan here relies on
//! strict comparisons to keep the earliest hour on ties.

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::FusionConfig;
use crate::model::{Highlight, Highlights, HourlyFusedRecord, Panel, PanelStatus};

pub const INSUFFICIENT_NOTE: &str = "Insufficient data points for a reliable average.";

/// Rows whose hour start lies in `[now, now + window_hours]`, both ends inclusive.
///
/// A window too large to represent extends to the end of time.
pub fn window<'a>(
    hourly: &'a [HourlyFusedRecord],
    now: DateTime<Utc>,
    window_hours: i64,
) -> Vec<&'a HourlyFusedRecord> {
    let end = TimeDelta::try_hours(window_hours)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    hourly
        .iter()
        .filter(|h| h.hour_start >= now && h.hour_start <= end)
        .collect()
}

pub fn compute_panel(window: &[&HourlyFusedRecord], min_points: usize) -> Panel {
    let n = window.len();
    if n == 0 || n < min_points {
        return Panel {
            average_24h_kmh: None,
            status: PanelStatus::Insufficient,
            note: Some(INSUFFICIENT_NOTE.to_string()),
            sample_count: n,
        };
    }
    let sum: f64 = window.iter().map(|h| h.sustained_kmh as f64).sum();
    Panel {
        average_24h_kmh: Some((sum / n as f64).round() as i64),
        status: PanelStatus::Sufficient,
        note: None,
        sample_count: n,
    }
}

/// Below-threshold test for calm hours. Strict: exactly `threshold` is not calm.
pub fn is_calm(value_kmh: f64, threshold_kmh: f64) -> bool {
    value_kmh < threshold_kmh
}

pub fn compute_highlights(window: &[&HourlyFusedRecord], calm_threshold_kmh: f64) -> Highlights {
    let Some((&first, rest)) = window.split_first() else {
        return Highlights::default();
    };

    let mut peak = first;
    let mut calm = first;
    for &h in rest {
        if h.sustained_kmh > peak.sustained_kmh {
            peak = h;
        }
        if h.sustained_kmh < calm.sustained_kmh {
            calm = h;
        }
    }

    Highlights {
        peak: Some(Highlight::from(peak)),
        calm: is_calm(calm.sustained_kmh as f64, calm_threshold_kmh).then(|| Highlight::from(calm)),
    }
}

/// Panel + highlights for the configured window.
pub fn analyze(
    hourly: &[HourlyFusedRecord],
    cfg: &FusionConfig,
    now: DateTime<Utc>,
) -> (Panel, Highlights) {
    let w = window(hourly, now, cfg.window_hours);
    let panel = compute_panel(&w, cfg.min_valid_points_for_average);
    let highlights = compute_highlights(&w, cfg.calm_threshold_kmh);
    tracing::debug!(
        target: "fusion",
        samples = panel.sample_count,
        status = ?panel.status,
        "analytics computed"
    );
    (panel, highlights)
}
