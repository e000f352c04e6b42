// Run the fusion pipeline once and print the aggregate as pretty JSON.
//
// Usage:
//   cargo run --bin forecast_once
//   FUSION_CONFIG_PATH=config/fusion.toml cargo run --bin forecast_once

use std::sync::Arc;

use anyhow::Context;
use wind_forecast_fusion::{FusionConfig, ForecastPipeline};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    wind_forecast_fusion::init_tracing();

    let config = Arc::new(FusionConfig::load_default()?);
    let pipeline = ForecastPipeline::from_config(config)?;

    // All-sources-failed is still a valid aggregate; exit 0.
    let out = pipeline.run().await;
    let json = serde_json::to_string_pretty(&out).context("serialize forecast")?;
    println!("{json}");
    Ok(())
}
