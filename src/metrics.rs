use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Fails if one is already installed.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        describe_fusion_metrics();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

static DESCRIBED: OnceCell<()> = OnceCell::new();

/// Register metric descriptions once per process. Safe to call repeatedly.
pub fn describe_fusion_metrics() {
    DESCRIBED.get_or_init(|| {
        describe_counter!("fusion_source_ok_total", "Sources that delivered records");
        describe_counter!("fusion_source_failures_total", "Sources that failed every strategy");
        describe_counter!(
            "fusion_source_generated_total",
            "Sources served by the generative fallback"
        );
        describe_counter!(
            "fusion_records_dropped_total",
            "Raw records dropped as malformed"
        );
        describe_gauge!("fusion_hours_emitted", "Fused hours in the last series");
        describe_histogram!("fusion_acquire_ms", "Wall time of the acquisition join (ms)");
    });
}
