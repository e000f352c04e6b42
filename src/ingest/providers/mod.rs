// src/ingest/providers/mod.rs
pub mod generative;
pub mod open_meteo;
pub mod windy;

use std::sync::Arc;
use std::time::Duration;

use crate::config::{FusionConfig, PrimaryApi};
use crate::error::SourceResult;
use crate::ingest::Acquirer;

pub(crate) const USER_AGENT: &str = concat!("wind-forecast-fusion/", env!("CARGO_PKG_VERSION"));

/// Build the production acquirer: one provider per primary API actually
/// referenced by a source, plus the generative fallback.
pub fn build_acquirer(cfg: &FusionConfig) -> SourceResult<Acquirer> {
    let timeout = Duration::from_secs(cfg.http_timeout_secs);

    let generator = generative::build_generator(&cfg.generative, timeout)?;
    let fallback = generative::GenerativeProvider::new(generator, &cfg.generative);
    let mut acquirer = Acquirer::new(Arc::new(fallback));

    let wants = |api: PrimaryApi| cfg.sources.iter().any(|s| s.primary == Some(api));

    if wants(PrimaryApi::Windy) {
        let p = windy::WindyProvider::new(cfg.windy.clone(), timeout)?;
        acquirer = acquirer.with_primary(PrimaryApi::Windy, Arc::new(p));
    }
    if wants(PrimaryApi::OpenMeteo) {
        let p = open_meteo::OpenMeteoProvider::new(cfg.open_meteo.clone(), &cfg.timezone, timeout)?;
        acquirer = acquirer.with_primary(PrimaryApi::OpenMeteo, Arc::new(p));
    }

    tracing::info!(
        target: "ingest",
        sources = cfg.sources.len(),
        generative = cfg.generative.enabled,
        provider = %cfg.generative.provider,
        "acquirer ready"
    );
    Ok(acquirer)
}
