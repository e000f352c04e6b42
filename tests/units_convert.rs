// tests/units_convert.rs
use wind_forecast_fusion::units::{
    compass_to_degrees, degrees_to_qualitative_label, to_canonical_speed, SpeedUnit,
};

#[test]
fn knots_round_trip_within_tolerance() {
    for v in [0.0, 1.0, 7.3, 22.5, 40.0] {
        let kmh = to_canonical_speed(v, SpeedUnit::Knots);
        assert!((kmh / 1.852 - v).abs() < 1e-9, "v={v} kmh={kmh}");
    }
}

#[test]
fn canonical_passes_through_exactly() {
    assert_eq!(to_canonical_speed(13.37, SpeedUnit::Kmh), 13.37);
    assert!((to_canonical_speed(10.0, SpeedUnit::MetersPerSecond) - 36.0).abs() < 1e-9);
}

#[test]
fn negative_speed_is_not_clamped() {
    assert_eq!(to_canonical_speed(-2.0, SpeedUnit::Kmh), -2.0);
}

#[test]
fn compass_points_case_insensitive() {
    assert_eq!(compass_to_degrees("N"), Some(0.0));
    assert_eq!(compass_to_degrees("nne"), Some(22.5));
    assert_eq!(compass_to_degrees(" Sw "), Some(225.0));
    assert_eq!(compass_to_degrees("NNW"), Some(337.5));
    assert_eq!(compass_to_degrees("NORTHISH"), None);
    assert_eq!(compass_to_degrees(""), None);
}

#[test]
fn octant_labels() {
    assert_eq!(degrees_to_qualitative_label(Some(0.0)).compass, "North");
    assert_eq!(degrees_to_qualitative_label(Some(359.0)).compass, "North");
    assert_eq!(degrees_to_qualitative_label(Some(90.0)).compass, "East");
    assert_eq!(degrees_to_qualitative_label(Some(180.0)).compass, "South");
    assert_eq!(degrees_to_qualitative_label(Some(224.0)).compass, "Southwest");

    let na = degrees_to_qualitative_label(None);
    assert!(na.is_unresolved());
    assert!(degrees_to_qualitative_label(Some(f64::NAN)).is_unresolved());
}

#[test]
fn unit_labels_deserialize_with_aliases() {
    let u: SpeedUnit = serde_json::from_str(r#""kts""#).unwrap();
    assert_eq!(u, SpeedUnit::Knots);
    let u: SpeedUnit = serde_json::from_str(r#""m/s""#).unwrap();
    assert_eq!(u, SpeedUnit::MetersPerSecond);
    let u: SpeedUnit = serde_json::from_str(r#""kph""#).unwrap();
    assert_eq!(u, SpeedUnit::Kmh);
}
