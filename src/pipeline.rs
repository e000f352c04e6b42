//! # Pipeline
//! Orchestrator → Normalizer → Fusion → Analytics, producing one
//! [`ForecastOutput`] per run.
//!
//! [`assemble`] is pure (acquisition already done, `now` injected) so the
//! whole downstream path is testable without I/O.

use anyhow::Context;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::analytics;
use crate::config::FusionConfig;
use crate::fusion;
use crate::ingest::providers::build_acquirer;
use crate::ingest::{Acquirer, Acquisition};
use crate::model::{ForecastHeader, ForecastOutput};
use crate::normalize::normalize_records;

pub const GENERATED_AT_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Downstream stages over an already-merged acquisition.
pub fn assemble(cfg: &FusionConfig, acquisition: Acquisition, now: DateTime<Utc>) -> ForecastOutput {
    let offset = cfg.offset();
    let normalized = normalize_records(&acquisition.records, &offset);
    let hourly = fusion::fuse_hourly(&normalized, cfg, now);
    let (panel, highlights) = analytics::analyze(&hourly, cfg, now);

    ForecastOutput {
        header: ForecastHeader {
            title: cfg.title.clone(),
            generated_at: now.with_timezone(&offset).format(GENERATED_AT_FORMAT).to_string(),
            timezone: cfg.timezone.clone(),
        },
        panel,
        highlights,
        hourly,
        sources: acquisition.statuses,
    }
}

/// Configured acquirer plus immutable config; cheap to share behind `Arc`.
pub struct ForecastPipeline {
    config: Arc<FusionConfig>,
    acquirer: Acquirer,
}

impl ForecastPipeline {
    /// Production wiring (real HTTP providers).
    pub fn from_config(config: Arc<FusionConfig>) -> anyhow::Result<Self> {
        let acquirer = build_acquirer(&config).context("building source acquirer")?;
        Ok(Self { config, acquirer })
    }

    /// Custom acquirer, e.g. mock providers in tests.
    pub fn with_acquirer(config: Arc<FusionConfig>, acquirer: Acquirer) -> Self {
        Self { config, acquirer }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    pub async fn run(&self) -> ForecastOutput {
        self.run_with_clock(Utc::now).await
    }

    /// One full batch pinned to `now`.
    pub async fn run_at(&self, now: DateTime<Utc>) -> ForecastOutput {
        self.run_with_clock(move || now).await
    }

    /// One full batch. `clock` is read once, after every source has settled,
    /// so the cutoff and the header describe the moment of assembly.
    pub async fn run_with_clock<F>(&self, clock: F) -> ForecastOutput
    where
        F: Fn() -> DateTime<Utc>,
    {
        let acquisition = self.acquirer.acquire_all(&self.config.sources).await;
        let out = assemble(&self.config, acquisition, clock());
        tracing::info!(
            target: "pipeline",
            hours = out.hourly.len(),
            failed = out.sources.iter().filter(|s| !s.is_ok()).count(),
            panel = ?out.panel.status,
            "forecast assembled"
        );
        out
    }
}
