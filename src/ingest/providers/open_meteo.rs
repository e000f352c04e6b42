use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::{OpenMeteoConfig, SourceConfig};
use crate::error::{SourceError, SourceResult};
use crate::ingest::types::{ForecastProvider, RawDirection, RawRecord, SpeedValue};
use crate::units::SpeedUnit;

const HOURLY_FIELDS: &str = "wind_speed_10m,wind_gusts_10m,wind_direction_10m";

#[derive(Debug, Deserialize)]
pub(crate) struct OpenMeteoResponse {
    hourly: Option<Hourly>,
}

#[derive(Debug, Deserialize)]
struct Hourly {
    /// Local wall-clock times ("2025-01-01T12:00") in the requested timezone.
    time: Vec<String>,
    #[serde(default)]
    wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    wind_gusts_10m: Vec<Option<f64>>,
    #[serde(default)]
    wind_direction_10m: Vec<Option<f64>>,
}

pub(crate) fn records_from_response(
    resp: OpenMeteoResponse,
    source_id: &str,
) -> SourceResult<Vec<RawRecord>> {
    let hourly = resp
        .hourly
        .ok_or_else(|| SourceError::InvalidPayload("missing hourly block".into()))?;

    let mut out = Vec::with_capacity(hourly.time.len());
    for (i, t) in hourly.time.iter().enumerate() {
        let Some(Some(speed)) = hourly.wind_speed_10m.get(i) else {
            continue;
        };
        let Some(Some(dir)) = hourly.wind_direction_10m.get(i) else {
            continue;
        };
        let gust = hourly.wind_gusts_10m.get(i).copied().flatten();

        out.push(RawRecord {
            time_utc: None,
            time_local: Some(t.clone()),
            sustained: SpeedValue::new(*speed, SpeedUnit::Kmh),
            gust: gust.map(|g| SpeedValue::new(g, SpeedUnit::Kmh)),
            direction: RawDirection::degrees(*dir),
            source: source_id.to_string(),
        });
    }
    Ok(out)
}

/// Open-Meteo hourly forecast (km/h, degrees, local timestamps).
pub struct OpenMeteoProvider {
    client: reqwest::Client,
    cfg: OpenMeteoConfig,
    timezone: String,
}

impl OpenMeteoProvider {
    pub fn new(cfg: OpenMeteoConfig, timezone: &str, timeout: Duration) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(super::USER_AGENT)
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            cfg,
            timezone: timezone.to_string(),
        })
    }
}

#[async_trait]
impl ForecastProvider for OpenMeteoProvider {
    async fn fetch_records(&self, source: &SourceConfig) -> SourceResult<Vec<RawRecord>> {
        let query = [
            ("latitude", self.cfg.latitude.to_string()),
            ("longitude", self.cfg.longitude.to_string()),
            ("hourly", HOURLY_FIELDS.to_string()),
            ("wind_speed_unit", "kmh".to_string()),
            ("timezone", self.timezone.clone()),
            ("forecast_days", self.cfg.forecast_days.to_string()),
        ];
        let resp = self
            .client
            .get(&self.cfg.endpoint)
            .query(&query)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SourceError::Status(resp.status().as_u16()));
        }
        let body: OpenMeteoResponse = resp.json().await?;
        records_from_response(body, &source.id)
    }

    fn name(&self) -> &'static str {
        "open_meteo"
    }
}
