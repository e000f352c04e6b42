// tests/fusion_hourly.rs
//
// Hourly fusion: weighted means, circular direction, divergence boundary,
// ordering, skipped weights and the post-fusion cutoff.

use chrono::{DateTime, Duration, TimeZone, Utc};
use wind_forecast_fusion::config::FusionConfig;
use wind_forecast_fusion::fusion::fuse_hourly;
use wind_forecast_fusion::model::FusionFlag;
use wind_forecast_fusion::normalize::NormalizedRecord;

// Seed weights: windguru_86525 -> 1.0, windyapp_osorio -> 1.2
const WG: &str = "windguru_86525";
const WY: &str = "windyapp_osorio";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

fn rec(ts: DateTime<Utc>, sustained: f64, dir: f64, source: &str) -> NormalizedRecord {
    NormalizedRecord {
        timestamp: ts,
        sustained_kmh: sustained,
        gust_kmh: sustained + 5.0,
        direction_deg: dir,
        source: source.to_string(),
    }
}

#[test]
fn two_source_scenario_fuses_speed_and_direction() {
    let cfg = FusionConfig::default_seed();
    let h = now() + Duration::hours(2);
    let out = fuse_hourly(
        &[rec(h, 20.0, 0.0, WG), rec(h + Duration::minutes(30), 24.0, 20.0, WY)],
        &cfg,
        now(),
    );

    assert_eq!(out.len(), 1);
    let row = &out[0];
    assert_eq!(row.hour_start, h);
    assert_eq!(row.sustained_kmh, 22);
    assert_eq!(row.gust_kmh, 27);
    assert_eq!(row.direction_deg, 11);
    assert_eq!(row.direction.compass, "North");
    assert!(row.flags.is_empty());
    assert_eq!(row.record_count, 2);
}

#[test]
fn record_count_counts_samples_not_sources() {
    let cfg = FusionConfig::default_seed();
    let h = now() + Duration::hours(3);
    let out = fuse_hourly(
        &[rec(h, 12.0, 90.0, WG), rec(h + Duration::minutes(30), 14.0, 90.0, WG)],
        &cfg,
        now(),
    );
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].record_count, 2);
    assert_eq!(out[0].sustained_kmh, 13);
}

#[test]
fn directions_straddling_north_average_to_north() {
    let cfg = FusionConfig::default_seed();
    let h = now() + Duration::hours(1);
    let out = fuse_hourly(&[rec(h, 10.0, 350.0, WG), rec(h, 10.0, 10.0, WG)], &cfg, now());
    assert_eq!(out[0].direction_deg, 0);
    assert_eq!(out[0].direction.compass, "North");
}

#[test]
fn divergence_flag_boundary() {
    let cfg = FusionConfig::default_seed();
    let h = now() + Duration::hours(1);

    let exact = fuse_hourly(&[rec(h, 10.0, 90.0, WG), rec(h, 18.0, 90.0, WY)], &cfg, now());
    assert!(!exact[0].has_flag(FusionFlag::HighDivergence));

    let over = fuse_hourly(&[rec(h, 10.0, 90.0, WG), rec(h, 18.01, 90.0, WY)], &cfg, now());
    assert!(over[0].has_flag(FusionFlag::HighDivergence));
}

#[test]
fn unweighted_records_do_not_count() {
    let cfg = FusionConfig::default_seed();
    let h1 = now() + Duration::hours(1);
    let h2 = now() + Duration::hours(2);

    let out = fuse_hourly(
        &[
            rec(h1, 10.0, 90.0, WG),
            // Unknown source: skipped, does not widen the spread.
            rec(h1, 50.0, 90.0, "mystery"),
            // Only unknown sources in this hour: bucket omitted.
            rec(h2, 30.0, 90.0, "mystery"),
        ],
        &cfg,
        now(),
    );

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].sustained_kmh, 10);
    assert!(out[0].flags.is_empty());
    assert_eq!(out[0].record_count, 1);
}

#[test]
fn series_is_strictly_ascending_and_unique() {
    let cfg = FusionConfig::default_seed();
    let recs: Vec<_> = [5, 1, 3, 1, 2, 5, 4]
        .iter()
        .map(|&h| rec(now() + Duration::hours(h) + Duration::minutes(7), 12.0, 45.0, WG))
        .collect();

    let out = fuse_hourly(&recs, &cfg, now());
    assert_eq!(out.len(), 5);
    for pair in out.windows(2) {
        assert!(pair[0].hour_start < pair[1].hour_start);
        assert_ne!(pair[0].hour, pair[1].hour);
    }
}

#[test]
fn past_hours_are_cut_after_fusion() {
    let cfg = FusionConfig::default_seed();
    let out = fuse_hourly(
        &[
            rec(now() - Duration::hours(3), 10.0, 0.0, WG),
            // Same hour as `now` (12:00) is kept.
            rec(now() + Duration::minutes(20), 11.0, 0.0, WG),
            rec(now() + Duration::hours(1), 12.0, 0.0, WG),
        ],
        &cfg,
        now(),
    );
    assert_eq!(out.len(), 2);
    assert!(out.iter().all(|h| h.hour_start >= now()));
}

#[test]
fn hour_label_uses_configured_offset() {
    let cfg = FusionConfig::default_seed(); // UTC-03:00
    let out = fuse_hourly(&[rec(now() + Duration::hours(3), 10.0, 0.0, WG)], &cfg, now());
    // 15:00 UTC -> 12:00 local
    assert_eq!(out[0].hour, "2025-06-01 12:00");
}

#[test]
fn rounded_direction_never_reports_360() {
    let cfg = FusionConfig::default_seed();
    let h = now() + Duration::hours(1);
    let out = fuse_hourly(&[rec(h, 10.0, 359.7, WG)], &cfg, now());
    assert_eq!(out[0].direction_deg, 0);
}
