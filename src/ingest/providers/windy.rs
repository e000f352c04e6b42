use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{SourceConfig, WindyConfig};
use crate::error::{SourceError, SourceResult};
use crate::ingest::types::{ForecastProvider, RawDirection, RawRecord, SpeedValue};
use crate::units::{wrap_degrees, SpeedUnit};

#[derive(Debug, Serialize)]
struct PointForecastRequest<'a> {
    lat: f64,
    lon: f64,
    model: &'a str,
    parameters: &'a [String],
    levels: &'a [String],
    key: &'a str,
}

/// Subset of the point-forecast v2 response we use.
/// Samples may be `null` when the model has no value for a step.
#[derive(Debug, Deserialize)]
pub(crate) struct PointForecastResponse {
    #[serde(default)]
    ts: Vec<i64>,
    #[serde(rename = "wind_u-surface", default)]
    wind_u: Vec<Option<f64>>,
    #[serde(rename = "wind_v-surface", default)]
    wind_v: Vec<Option<f64>>,
    #[serde(rename = "gust-surface", default)]
    gust: Option<Vec<Option<f64>>>,
}

/// Speed (same unit as the components) and meteorological direction
/// (where the wind blows *from*) in [0, 360).
pub fn wind_from_components(u: f64, v: f64) -> (f64, f64) {
    let speed = u.hypot(v);
    let direction = wrap_degrees((-u).atan2(-v).to_degrees());
    (speed, direction)
}

/// Point-forecast timestamps are epoch milliseconds; small values are read as seconds.
fn epoch_to_utc(t: i64) -> Option<DateTime<Utc>> {
    if t.abs() >= 100_000_000_000 {
        DateTime::<Utc>::from_timestamp_millis(t)
    } else {
        DateTime::<Utc>::from_timestamp(t, 0)
    }
}

pub(crate) fn records_from_response(
    resp: PointForecastResponse,
    source_id: &str,
) -> SourceResult<Vec<RawRecord>> {
    if resp.ts.is_empty() || resp.wind_u.is_empty() || resp.wind_v.is_empty() {
        return Err(SourceError::InvalidPayload(
            "missing ts / wind_u-surface / wind_v-surface".into(),
        ));
    }

    let mut out = Vec::with_capacity(resp.ts.len());
    for (i, &t) in resp.ts.iter().enumerate() {
        let (Some(Some(u)), Some(Some(v))) = (resp.wind_u.get(i), resp.wind_v.get(i)) else {
            continue;
        };
        let Some(ts) = epoch_to_utc(t) else {
            continue;
        };
        let (speed, direction) = wind_from_components(*u, *v);
        let gust = resp
            .gust
            .as_ref()
            .and_then(|g| g.get(i).copied().flatten())
            .filter(|g| g.is_finite() && *g > 0.0)
            .unwrap_or(speed);

        out.push(RawRecord {
            time_utc: Some(ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
            time_local: None,
            sustained: SpeedValue::new(speed, SpeedUnit::MetersPerSecond),
            gust: Some(SpeedValue::new(gust, SpeedUnit::MetersPerSecond)),
            direction: RawDirection::degrees(direction),
            source: source_id.to_string(),
        });
    }
    Ok(out)
}

/// Windy point-forecast API (wind vector components + gust, m/s).
pub struct WindyProvider {
    client: reqwest::Client,
    cfg: WindyConfig,
    api_key: Option<String>,
}

impl WindyProvider {
    pub fn new(cfg: WindyConfig, timeout: Duration) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(super::USER_AGENT)
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()?;
        let api_key = cfg.resolved_api_key();
        Ok(Self {
            client,
            cfg,
            api_key,
        })
    }
}

#[async_trait]
impl ForecastProvider for WindyProvider {
    async fn fetch_records(&self, source: &SourceConfig) -> SourceResult<Vec<RawRecord>> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(SourceError::MissingApiKey("windy"))?;

        let payload = PointForecastRequest {
            lat: self.cfg.lat,
            lon: self.cfg.lon,
            model: &self.cfg.model,
            parameters: &self.cfg.parameters,
            levels: &self.cfg.levels,
            key,
        };

        let resp = self
            .client
            .post(&self.cfg.endpoint)
            .json(&payload)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SourceError::Status(resp.status().as_u16()));
        }
        let body: PointForecastResponse = resp.json().await?;
        let records = records_from_response(body, &source.id)?;

        tracing::debug!(
            target: "ingest",
            source = %source.id,
            records = records.len(),
            "windy point forecast parsed"
        );
        Ok(records)
    }

    fn name(&self) -> &'static str {
        "windy"
    }
}
