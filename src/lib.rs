// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod analytics;
pub mod api;
pub mod config;
pub mod error;
pub mod fusion;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod units;

pub use crate::api::router;
pub use crate::config::FusionConfig;
pub use crate::model::ForecastOutput;
pub use crate::pipeline::ForecastPipeline;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact `fmt` logging driven by `RUST_LOG`. No-op if a subscriber is
/// already installed (e.g. by the Shuttle runtime).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("wind_forecast_fusion=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}
