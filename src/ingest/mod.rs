// src/ingest/mod.rs
//! Source acquisition: one concurrent task per configured source, each trying
//! its primary machine API first and the generative fallback second.
//!
//! Results are merged only after every task has finished; a failing or
//! panicking source never affects its siblings.

pub mod providers;
pub mod types;

use metrics::{counter, histogram};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{PrimaryApi, SourceConfig};
use crate::error::SourceError;
use crate::ingest::types::{ForecastProvider, RawRecord};
use crate::model::{SourceState, SourceStatus};

/// What one source produced in this run.
#[derive(Debug)]
pub struct SourceOutcome {
    pub source: SourceConfig,
    pub records: Vec<RawRecord>,
    pub state: SourceState,
    pub generated: bool,
    pub error: Option<String>,
}

impl SourceOutcome {
    fn ok(source: SourceConfig, records: Vec<RawRecord>, generated: bool) -> Self {
        Self {
            source,
            records,
            state: SourceState::Ok,
            generated,
            error: None,
        }
    }

    fn failure(source: SourceConfig, generated: bool, error: &SourceError) -> Self {
        Self {
            source,
            records: Vec::new(),
            state: SourceState::Failure,
            generated,
            error: Some(error.to_string()),
        }
    }

    pub fn status(&self) -> SourceStatus {
        SourceStatus::from_source(&self.source, self.state, self.generated)
    }
}

/// Merged result of all sources.
#[derive(Debug, Default)]
pub struct Acquisition {
    pub records: Vec<RawRecord>,
    /// One entry per configured source, in configured order.
    pub statuses: Vec<SourceStatus>,
}

impl Acquisition {
    pub fn from_outcomes(outcomes: Vec<SourceOutcome>) -> Self {
        let mut acq = Acquisition::default();
        for o in outcomes {
            acq.statuses.push(o.status());
            acq.records.extend(o.records);
        }
        acq
    }
}

/// Strategy registry: primaries keyed by API, one shared fallback.
#[derive(Clone)]
pub struct Acquirer {
    primaries: HashMap<PrimaryApi, Arc<dyn ForecastProvider>>,
    fallback: Arc<dyn ForecastProvider>,
}

impl Acquirer {
    pub fn new(fallback: Arc<dyn ForecastProvider>) -> Self {
        Self {
            primaries: HashMap::new(),
            fallback,
        }
    }

    pub fn with_primary(mut self, api: PrimaryApi, provider: Arc<dyn ForecastProvider>) -> Self {
        self.primaries.insert(api, provider);
        self
    }

    /// Run every source concurrently and wait for all of them.
    pub async fn acquire_all(&self, sources: &[SourceConfig]) -> Acquisition {
        crate::metrics::describe_fusion_metrics();
        let t0 = std::time::Instant::now();

        let handles: Vec<_> = sources
            .iter()
            .cloned()
            .map(|source| {
                let primary = source
                    .primary
                    .map(|api| (api, self.primaries.get(&api).cloned()));
                let fallback = Arc::clone(&self.fallback);
                let task_source = source.clone();
                let handle = tokio::spawn(async move {
                    acquire_source(task_source, primary, fallback).await
                });
                (source, handle)
            })
            .collect();

        // Full join: collect everything before merging.
        let mut outcomes = Vec::with_capacity(handles.len());
        for (source, handle) in handles {
            let outcome = match handle.await {
                Ok(o) => o,
                Err(e) => {
                    let err = SourceError::TaskPanicked(e.to_string());
                    tracing::warn!(target: "ingest", source = %source.id, error = %err, "acquisition task died");
                    SourceOutcome::failure(source, true, &err)
                }
            };
            outcomes.push(outcome);
        }

        for o in &outcomes {
            match o.state {
                SourceState::Ok => {
                    counter!("fusion_source_ok_total").increment(1);
                    if o.generated {
                        counter!("fusion_source_generated_total").increment(1);
                    }
                }
                SourceState::Failure => counter!("fusion_source_failures_total").increment(1),
            }
        }
        histogram!("fusion_acquire_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let acq = Acquisition::from_outcomes(outcomes);
        tracing::info!(
            target: "ingest",
            sources = acq.statuses.len(),
            ok = acq.statuses.iter().filter(|s| s.is_ok()).count(),
            records = acq.records.len(),
            "acquisition finished"
        );
        acq
    }
}

/// Two-stage strategy chain for a single source.
///
/// `generated` stays `true` unless the primary API delivered records.
pub async fn acquire_source(
    source: SourceConfig,
    primary: Option<(PrimaryApi, Option<Arc<dyn ForecastProvider>>)>,
    fallback: Arc<dyn ForecastProvider>,
) -> SourceOutcome {
    if let Some((api, provider)) = primary {
        let attempt = match provider {
            Some(p) => p.fetch_records(&source).await,
            None => Err(SourceError::Unregistered(api.as_str().to_string())),
        };
        match attempt {
            Ok(records) if !records.is_empty() => {
                tracing::info!(target: "ingest", source = %source.id, strategy = api.as_str(), records = records.len(), "primary ok");
                return SourceOutcome::ok(source.clone(), stamp(records, &source.id), false);
            }
            Ok(_) => {
                tracing::warn!(target: "ingest", source = %source.id, strategy = api.as_str(), "primary returned no records, falling back");
            }
            Err(e) => {
                tracing::warn!(target: "ingest", source = %source.id, strategy = api.as_str(), error = %e, "primary failed, falling back");
            }
        }
    }

    match fallback.fetch_records(&source).await {
        Ok(records) if !records.is_empty() => {
            tracing::info!(target: "ingest", source = %source.id, strategy = fallback.name(), records = records.len(), "fallback ok");
            let records = stamp(records, &source.id);
            SourceOutcome::ok(source, records, true)
        }
        Ok(_) => {
            let err = SourceError::Empty;
            tracing::warn!(target: "ingest", source = %source.id, strategy = fallback.name(), error = %err, "source failed");
            SourceOutcome::failure(source, true, &err)
        }
        Err(e) => {
            tracing::warn!(target: "ingest", source = %source.id, strategy = fallback.name(), error = %e, "source failed");
            SourceOutcome::failure(source, true, &e)
        }
    }
}

/// Records always carry the id of the source that acquired them.
fn stamp(mut records: Vec<RawRecord>, source_id: &str) -> Vec<RawRecord> {
    for r in &mut records {
        if r.source != source_id {
            r.source = source_id.to_string();
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceResult;
    use crate::ingest::types::{RawDirection, SpeedValue};
    use crate::units::SpeedUnit;
    use async_trait::async_trait;

    struct Fixed(usize);

    #[async_trait]
    impl ForecastProvider for Fixed {
        async fn fetch_records(&self, _source: &SourceConfig) -> SourceResult<Vec<RawRecord>> {
            Ok((0..self.0)
                .map(|_| RawRecord {
                    time_utc: Some("2025-01-01T00:00:00Z".into()),
                    time_local: None,
                    sustained: SpeedValue::new(10.0, SpeedUnit::Kmh),
                    gust: None,
                    direction: RawDirection::degrees(0.0),
                    source: "payload-claims-other".into(),
                })
                .collect())
        }
        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn src(primary: Option<PrimaryApi>) -> SourceConfig {
        SourceConfig {
            id: "s1".into(),
            name: "S".into(),
            location: "L".into(),
            url: String::new(),
            weight_key: "k".into(),
            primary,
        }
    }

    #[tokio::test]
    async fn unregistered_primary_falls_back() {
        let out = acquire_source(
            src(Some(PrimaryApi::OpenMeteo)),
            Some((PrimaryApi::OpenMeteo, None)),
            Arc::new(Fixed(2)),
        )
        .await;
        assert_eq!(out.state, SourceState::Ok);
        assert!(out.generated);
        assert!(out.records.iter().all(|r| r.source == "s1"));
    }

    #[tokio::test]
    async fn empty_fallback_is_failure() {
        let out = acquire_source(src(None), None, Arc::new(Fixed(0))).await;
        assert_eq!(out.state, SourceState::Failure);
        assert!(out.records.is_empty());
        assert!(out.error.is_some());
    }
}
