// tests/generative_parse.rs
//
// Parsing free-form generator output into raw records, and the provider
// wrapper on top of a canned text generator.

use async_trait::async_trait;
use std::sync::Arc;

use wind_forecast_fusion::config::{FusionConfig, GenerativeConfig};
use wind_forecast_fusion::error::{SourceError, SourceResult};
use wind_forecast_fusion::ingest::providers::generative::{
    build_generator, parse_generated_records, GenerativeProvider, TextGenerator,
};
use wind_forecast_fusion::ingest::types::ForecastProvider;
use wind_forecast_fusion::units::SpeedUnit;

const FENCED: &str = r#"Sure! Based on the latest GFS run, here is the forecast:

```json
[
  {"time_utc": "2025-06-01T12:00:00Z", "sustained": {"value": 12, "unit": "knots"},
   "gust": {"value": 18, "unit": "knots"}, "direction": {"degrees": 90}},
  {"time_utc": "2025-06-01T13:00:00Z", "sustained": {"value": 5, "unit": "m/s"},
   "direction": {"compass": "ENE"}}
]
```

Let me know if you need anything else."#;

#[test]
fn fenced_block_with_prose_parses() {
    let recs = parse_generated_records(FENCED, "windguru_86525").unwrap();
    assert_eq!(recs.len(), 2);
    assert!(recs.iter().all(|r| r.source == "windguru_86525"));
    assert_eq!(recs[0].sustained.unit, SpeedUnit::Knots);
    assert_eq!(recs[1].sustained.unit, SpeedUnit::MetersPerSecond);
    assert!(recs[1].gust.is_none());
    assert_eq!(recs[1].direction.compass.as_deref(), Some("ENE"));
}

#[test]
fn bare_array_parses() {
    let text = r#"Forecast: [{"time_local": "2025-06-01 09:00", "sustained": {"value": 20, "unit": "km/h"}, "direction": {"cardinal": "S"}}] done."#;
    let recs = parse_generated_records(text, "x").unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].direction.compass.as_deref(), Some("S"));
}

#[test]
fn citation_markers_before_the_array_are_skipped() {
    let text = r#"Based on Windguru data [1], the forecast is: [{"time_utc": "2025-06-01T12:00:00Z", "sustained": {"value": 14, "unit": "knots"}, "direction": {"degrees": 90}}] (see [2])."#;
    let recs = parse_generated_records(text, "x").unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].direction.degrees, Some(90.0));
}

#[test]
fn record_array_after_fenced_citations_is_found() {
    let text = "Sources:\n```\n[1] windguru.cz\n```\nData:\n```json\n[{\"time_utc\": \"2025-06-01T12:00:00Z\", \"sustained\": {\"value\": 3, \"unit\": \"m/s\"}, \"direction\": {\"compass\": \"S\"}}]\n```";
    let recs = parse_generated_records(text, "x").unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].sustained.unit, SpeedUnit::MetersPerSecond);
}

#[test]
fn only_citation_markers_is_empty() {
    let err = parse_generated_records("No data available [1][2].", "x").unwrap_err();
    assert!(matches!(err, SourceError::Empty));
}

#[test]
fn malformed_elements_are_dropped() {
    let text = r#"[
        {"time_utc": "2025-06-01T12:00:00Z", "sustained": {"value": 10, "unit": "kmh"}},
        {"time_utc": "2025-06-01T13:00:00Z", "sustained": {"value": 10, "unit": "furlongs"}},
        "not even an object"
    ]"#;
    let recs = parse_generated_records(text, "x").unwrap();
    assert_eq!(recs.len(), 1);
}

#[test]
fn no_array_is_failure() {
    let err = parse_generated_records("I cannot help with that.", "x").unwrap_err();
    assert!(matches!(err, SourceError::NoJsonArray));
}

#[test]
fn empty_array_is_failure() {
    let err = parse_generated_records("```json\n[]\n```", "x").unwrap_err();
    assert!(matches!(err, SourceError::Empty));
}

#[test]
fn invalid_json_is_failure() {
    let err = parse_generated_records("[{\"a\": }]", "x").unwrap_err();
    assert!(matches!(err, SourceError::Parse(_)));
}

struct Canned(&'static str);

#[async_trait]
impl TextGenerator for Canned {
    async fn generate(&self, _prompt: &str) -> SourceResult<String> {
        Ok(self.0.to_string())
    }
    fn name(&self) -> &'static str {
        "canned"
    }
}

#[tokio::test]
async fn provider_stamps_source_id() {
    let cfg = FusionConfig::default_seed();
    let provider = GenerativeProvider::new(Arc::new(Canned(FENCED)), &cfg.generative);
    let recs = provider.fetch_records(&cfg.sources[1]).await.unwrap();
    assert_eq!(recs.len(), 2);
    assert!(recs.iter().all(|r| r.source == cfg.sources[1].id));
}

#[tokio::test]
async fn disabled_generator_fails_the_source() {
    let cfg = GenerativeConfig {
        enabled: false,
        ..GenerativeConfig::default()
    };
    let generator = build_generator(&cfg, std::time::Duration::from_secs(1)).unwrap();
    assert_eq!(generator.name(), "disabled");

    let seed = FusionConfig::default_seed();
    let provider = GenerativeProvider::new(generator, &cfg);
    let err = provider.fetch_records(&seed.sources[0]).await.unwrap_err();
    assert!(matches!(err, SourceError::Disabled(_)));
}
