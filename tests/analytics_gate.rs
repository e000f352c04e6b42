// tests/analytics_gate.rs
//
// Confidence gate, window bounds, peak/calm selection.

use chrono::{DateTime, Duration, TimeZone, Utc};
use wind_forecast_fusion::analytics::{analyze, compute_highlights, compute_panel, is_calm, window};
use wind_forecast_fusion::config::FusionConfig;
use wind_forecast_fusion::model::{HourlyFusedRecord, PanelStatus};
use wind_forecast_fusion::units::degrees_to_qualitative_label;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

fn row(offset_h: i64, sustained: i64) -> HourlyFusedRecord {
    let hour_start = now() + Duration::hours(offset_h);
    HourlyFusedRecord {
        hour: hour_start.format("%Y-%m-%d %H:%M").to_string(),
        hour_start,
        sustained_kmh: sustained,
        gust_kmh: sustained + 4,
        direction_deg: 90,
        direction: degrees_to_qualitative_label(Some(90.0)),
        flags: Vec::new(),
        record_count: 1,
    }
}

fn series(values: &[i64]) -> Vec<HourlyFusedRecord> {
    values.iter().enumerate().map(|(i, &v)| row(i as i64, v)).collect()
}

#[test]
fn one_below_threshold_is_insufficient() {
    let s = series(&[10; 7]);
    let w = window(&s, now(), 24);
    let p = compute_panel(&w, 8);
    assert_eq!(p.status, PanelStatus::Insufficient);
    assert_eq!(p.average_24h_kmh, None);
    assert!(p.note.is_some());
    assert_eq!(p.sample_count, 7);
}

#[test]
fn exactly_threshold_is_sufficient() {
    let s = series(&[10, 11, 12, 13, 14, 15, 16, 17]);
    let w = window(&s, now(), 24);
    let p = compute_panel(&w, 8);
    assert_eq!(p.status, PanelStatus::Sufficient);
    // mean 13.5 rounds away from zero
    assert_eq!(p.average_24h_kmh, Some(14));
    assert!(p.note.is_none());
}

#[test]
fn panel_average_serializes_as_null_when_missing() {
    let p = compute_panel(&[], 8);
    let v = serde_json::to_value(&p).unwrap();
    assert!(v["average_24h_kmh"].is_null());
    assert_eq!(v["status"], "insufficient");
}

#[test]
fn window_is_inclusive_at_both_ends() {
    let s = vec![row(-1, 1), row(0, 2), row(24, 3), row(25, 4)];
    let w = window(&s, now(), 24);
    let got: Vec<i64> = w.iter().map(|h| h.sustained_kmh).collect();
    assert_eq!(got, vec![2, 3]);
}

#[test]
fn peak_ties_keep_first_hour() {
    let s = series(&[10, 15, 15, 9]);
    let w = window(&s, now(), 24);
    let h = compute_highlights(&w, 5.0);
    let peak = h.peak.unwrap();
    assert_eq!(peak.sustained_kmh, 15);
    assert_eq!(peak.hour, s[1].hour);
    assert!(h.calm.is_none());
}

#[test]
fn calm_only_below_threshold() {
    let s = series(&[10, 4, 4, 12]);
    let w = window(&s, now(), 24);
    let calm = compute_highlights(&w, 5.0).calm.unwrap();
    assert_eq!(calm.sustained_kmh, 4);
    assert_eq!(calm.hour, s[1].hour);

    let s = series(&[10, 5, 12]);
    let w = window(&s, now(), 24);
    assert!(compute_highlights(&w, 5.0).calm.is_none());
}

#[test]
fn calm_threshold_boundary() {
    assert!(is_calm(4.99, 5.0));
    assert!(!is_calm(5.0, 5.0));
    assert!(!is_calm(5.01, 5.0));
}

#[test]
fn empty_window_has_no_highlights() {
    let s = vec![row(30, 2)];
    let cfg = FusionConfig::default_seed();
    let (panel, hl) = analyze(&s, &cfg, now());
    assert_eq!(panel.status, PanelStatus::Insufficient);
    assert!(hl.peak.is_none());
    assert!(hl.calm.is_none());
}

#[test]
fn huge_configured_window_is_sanitized_before_analysis() {
    let cfg = FusionConfig::from_toml_str("window_hours = 10000000000000").unwrap();
    assert_eq!(cfg.window_hours, 24);

    let s = vec![row(24, 3), row(25, 4)];
    let (panel, hl) = analyze(&s, &cfg, now());
    assert_eq!(panel.sample_count, 1);
    assert_eq!(hl.calm.unwrap().sustained_kmh, 3);
}
