// src/ingest/types.rs
use serde::{Deserialize, Serialize};

use crate::config::SourceConfig;
use crate::error::SourceResult;
use crate::units::SpeedUnit;

/// A speed claim in the source's own unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedValue {
    pub value: f64,
    pub unit: SpeedUnit,
}

impl SpeedValue {
    pub fn new(value: f64, unit: SpeedUnit) -> Self {
        Self { value, unit }
    }
}

/// Direction as reported: explicit degrees win over a compass label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDirection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degrees: Option<f64>,
    #[serde(default, alias = "cardinal", skip_serializing_if = "Option::is_none")]
    pub compass: Option<String>,
}

impl RawDirection {
    pub fn degrees(deg: f64) -> Self {
        Self {
            degrees: Some(deg),
            compass: None,
        }
    }

    pub fn compass(label: impl Into<String>) -> Self {
        Self {
            degrees: None,
            compass: Some(label.into()),
        }
    }
}

/// One source's claim about one instant, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Absolute instant (RFC 3339, or naive ISO read as UTC).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_utc: Option<String>,
    /// Wall-clock time in the configured forecast timezone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_local: Option<String>,
    pub sustained: SpeedValue,
    /// Missing gust falls back to the sustained value during normalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gust: Option<SpeedValue>,
    #[serde(default)]
    pub direction: RawDirection,
    /// Stamped by the acquiring provider, never trusted from payloads.
    #[serde(default)]
    pub source: String,
}

/// A retrieval strategy for a configured source (machine API or generative text).
#[async_trait::async_trait]
pub trait ForecastProvider: Send + Sync {
    async fn fetch_records(&self, source: &SourceConfig) -> SourceResult<Vec<RawRecord>>;
    fn name(&self) -> &'static str;
}
