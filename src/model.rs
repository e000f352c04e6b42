//! Output shapes handed to consumers.
//!
//! `ForecastOutput` is the single aggregate produced per run. Everything here
//! is plain data: built once by the pipeline, read-only afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::SourceConfig;
use crate::units::DirectionDescription;

/// Acquisition outcome of one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceState {
    Ok,
    Failure,
}

/// Per-source health for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStatus {
    pub id: String,
    pub url: String,
    pub name: String,
    pub location: String,
    pub status: SourceState,
    /// Data came from the generative fallback rather than a machine API.
    pub generated: bool,
}

impl SourceStatus {
    pub fn from_source(source: &SourceConfig, status: SourceState, generated: bool) -> Self {
        Self {
            id: source.id.clone(),
            url: source.url.clone(),
            name: source.name.clone(),
            location: source.location.clone(),
            status,
            generated,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == SourceState::Ok
    }
}

/// Quality flags attached to a fused hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionFlag {
    /// Sustained-speed spread across sources exceeded the divergence threshold.
    HighDivergence,
}

/// One fused hour of the consolidated series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyFusedRecord {
    /// Local label, `YYYY-MM-DD HH:MM`.
    pub hour: String,
    pub hour_start: DateTime<Utc>,
    pub sustained_kmh: i64,
    pub gust_kmh: i64,
    pub direction_deg: i64,
    pub direction: DirectionDescription,
    #[serde(default)]
    pub flags: Vec<FusionFlag>,
    /// Weighted records folded into this hour. Several samples from one
    /// source within the hour each count.
    pub record_count: usize,
}

impl HourlyFusedRecord {
    pub fn has_flag(&self, flag: FusionFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// Standout hour (peak or calm).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub hour: String,
    pub sustained_kmh: i64,
}

impl From<&HourlyFusedRecord> for Highlight {
    fn from(r: &HourlyFusedRecord) -> Self {
        Self {
            hour: r.hour.clone(),
            sustained_kmh: r.sustained_kmh,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Highlights {
    pub peak: Option<Highlight>,
    pub calm: Option<Highlight>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelStatus {
    Sufficient,
    Insufficient,
}

/// Confidence-gated near-term average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    /// `None` (JSON `null`) when not enough samples.
    pub average_24h_kmh: Option<i64>,
    pub status: PanelStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub sample_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastHeader {
    pub title: String,
    /// Local time, `DD/MM/YYYY HH:MM`.
    pub generated_at: String,
    pub timezone: String,
}

/// Root aggregate returned by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastOutput {
    pub header: ForecastHeader,
    pub panel: Panel,
    pub highlights: Highlights,
    pub hourly: Vec<HourlyFusedRecord>,
    pub sources: Vec<SourceStatus>,
}

impl ForecastOutput {
    /// Same aggregate with the hourly table cut to the first `hours` rows.
    pub fn truncated(mut self, hours: usize) -> Self {
        self.hourly.truncate(hours);
        self
    }

    /// Statuses grouped by location (sorted), configured order kept within a group.
    pub fn sources_by_location(&self) -> BTreeMap<String, Vec<SourceStatus>> {
        let mut out: BTreeMap<String, Vec<SourceStatus>> = BTreeMap::new();
        for s in &self.sources {
            out.entry(s.location.clone()).or_default().push(s.clone());
        }
        out
    }
}
