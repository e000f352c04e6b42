use std::collections::BTreeMap;
use std::sync::Arc;

use shuttle_axum::axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::model::{ForecastOutput, SourceStatus};
use crate::pipeline::ForecastPipeline;

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<ForecastPipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<ForecastPipeline>) -> Self {
        Self { pipeline }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/forecast", get(forecast))
        .route("/sources", get(sources))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Deserialize)]
struct ForecastQuery {
    #[serde(default)]
    hours: Option<usize>,
}

// Computed fresh on every request; nothing is cached between calls.
async fn forecast(
    State(state): State<AppState>,
    Query(q): Query<ForecastQuery>,
) -> Json<ForecastOutput> {
    let out = state.pipeline.run().await;
    Json(match q.hours {
        Some(n) => out.truncated(n),
        None => out,
    })
}

// Statuses come out of a full acquisition, generative fallbacks included,
// so this costs as much upstream traffic as `/forecast`.
async fn sources(State(state): State<AppState>) -> Json<BTreeMap<String, Vec<SourceStatus>>> {
    let out = state.pipeline.run().await;
    Json(out.sources_by_location())
}
