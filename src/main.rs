//! Wind forecast fusion service: binary entrypoint.
//! Boots the Axum HTTP server with the forecast routes and the Prometheus exporter.

use shuttle_axum::ShuttleAxum;
use std::sync::Arc;

use wind_forecast_fusion::{api, metrics::Metrics, FusionConfig, ForecastPipeline};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    wind_forecast_fusion::init_tracing();

    let config = Arc::new(FusionConfig::load_default()?);
    tracing::info!(
        target: "pipeline",
        title = %config.title,
        sources = config.sources.len(),
        "config loaded"
    );

    let pipeline = Arc::new(ForecastPipeline::from_config(config)?);
    let metrics = Metrics::init()?;

    let router = api::router(api::AppState::new(pipeline)).merge(metrics.router());

    Ok(router.into())
}
