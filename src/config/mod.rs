//! # Configuration
//!
//! Static, read-once configuration for one forecast run: sources, fusion
//! weights, thresholds, timezone, and collaborator endpoints.
//!
//! Loaded from TOML with the following precedence:
//! 1) `$FUSION_CONFIG_PATH` (error if it points to a missing file)
//! 2) `config/fusion.toml`
//! 3) built-in [`FusionConfig::default_seed`]
//!
//! The result is wrapped in an `Arc` by callers and passed explicitly
//! into each stage; nothing here is global or mutable after load.

pub mod ai;

use anyhow::{anyhow, Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub use ai::GenerativeConfig;

pub const ENV_FUSION_CONFIG_PATH: &str = "FUSION_CONFIG_PATH";
pub const DEFAULT_FUSION_CONFIG_PATH: &str = "config/fusion.toml";

pub const DEFAULT_DIVERGENCE_THRESHOLD_KMH: f64 = 8.0;
pub const DEFAULT_CALM_THRESHOLD_KMH: f64 = 5.0;
pub const DEFAULT_MIN_VALID_POINTS_FOR_AVERAGE: usize = 8;
/// Upper bound for the analytics window (one week).
pub const MAX_WINDOW_HOURS: i64 = 168;

fn default_title() -> String {
    "Wind in Osório".to_string()
}
fn default_timezone() -> String {
    "America/Sao_Paulo".to_string()
}
fn default_utc_offset_minutes() -> i32 {
    -180
}
fn default_divergence() -> f64 {
    DEFAULT_DIVERGENCE_THRESHOLD_KMH
}
fn default_calm() -> f64 {
    DEFAULT_CALM_THRESHOLD_KMH
}
fn default_min_points() -> usize {
    DEFAULT_MIN_VALID_POINTS_FOR_AVERAGE
}
fn default_window_hours() -> i64 {
    24
}
fn default_http_timeout_secs() -> u64 {
    20
}

/// Machine API used as a source's first strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryApi {
    Windy,
    OpenMeteo,
}

impl PrimaryApi {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimaryApi::Windy => "windy",
            PrimaryApi::OpenMeteo => "open_meteo",
        }
    }
}

/// One configured forecast source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub name: String,
    pub location: String,
    /// For status display only.
    #[serde(default)]
    pub url: String,
    pub weight_key: String,
    #[serde(default)]
    pub primary: Option<PrimaryApi>,
}

/// `[windy]` point-forecast API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindyConfig {
    #[serde(default = "WindyConfig::default_endpoint")]
    pub endpoint: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default = "WindyConfig::default_model")]
    pub model: String,
    #[serde(default = "WindyConfig::default_parameters")]
    pub parameters: Vec<String>,
    #[serde(default = "WindyConfig::default_levels")]
    pub levels: Vec<String>,
    /// "ENV" means: read from WINDY_API_KEY
    #[serde(default = "WindyConfig::default_api_key")]
    pub api_key: String,
}

impl WindyConfig {
    fn default_endpoint() -> String {
        "https://api.windy.com/api/point-forecast/v2".to_string()
    }
    fn default_model() -> String {
        "gfs".to_string()
    }
    fn default_parameters() -> Vec<String> {
        vec!["wind".to_string(), "windGust".to_string()]
    }
    fn default_levels() -> Vec<String> {
        vec!["surface".to_string()]
    }
    fn default_api_key() -> String {
        "ENV".to_string()
    }

    pub fn resolved_api_key(&self) -> Option<String> {
        resolve_secret(&self.api_key, "WINDY_API_KEY")
    }
}

impl Default for WindyConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            lat: -29.90035,
            lon: -50.27377,
            model: Self::default_model(),
            parameters: Self::default_parameters(),
            levels: Self::default_levels(),
            api_key: Self::default_api_key(),
        }
    }
}

/// `[open_meteo]` hourly forecast API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenMeteoConfig {
    #[serde(default = "OpenMeteoConfig::default_endpoint")]
    pub endpoint: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "OpenMeteoConfig::default_forecast_days")]
    pub forecast_days: u32,
}

impl OpenMeteoConfig {
    fn default_endpoint() -> String {
        "https://api.open-meteo.com/v1/forecast".to_string()
    }
    fn default_forecast_days() -> u32 {
        3
    }
}

impl Default for OpenMeteoConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            latitude: -29.8889,
            longitude: -50.2667,
            forecast_days: Self::default_forecast_days(),
        }
    }
}

/// Root configuration for a forecast run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    #[serde(default = "default_title")]
    pub title: String,
    /// IANA id, reported in the output header.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Fixed offset used for local-time parsing and hour labels.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    #[serde(default = "default_divergence")]
    pub divergence_threshold_kmh: f64,
    #[serde(default = "default_calm")]
    pub calm_threshold_kmh: f64,
    #[serde(default = "default_min_points")]
    pub min_valid_points_for_average: usize,
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// weight key → positive fusion weight
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub windy: WindyConfig,
    #[serde(default)]
    pub open_meteo: OpenMeteoConfig,
    #[serde(default)]
    pub generative: GenerativeConfig,
}

impl FusionConfig {
    /// Load from an explicit TOML path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading fusion config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing fusion config {}", path.display()))
    }

    /// Load using env var + fallbacks (see module docs).
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_FUSION_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from_file(&pb);
            }
            return Err(anyhow!(
                "{ENV_FUSION_CONFIG_PATH} points to non-existent path {}",
                pb.display()
            ));
        }
        let default_p = PathBuf::from(DEFAULT_FUSION_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from_file(&default_p);
        }
        Ok(Self::default_seed())
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: FusionConfig = toml::from_str(s)?;
        Ok(cfg.sanitized())
    }

    /// Built-in seed: the four Osório sources and their weights.
    pub fn default_seed() -> Self {
        let weights = [("windguru", 1.0), ("windfinder", 1.0), ("windyapp", 1.2)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        let sources = vec![
            SourceConfig {
                id: "windyapp_osorio".into(),
                name: "Windy".into(),
                location: "Osório".into(),
                url: "https://windy.app/forecast2/spot/4906371/Osorio".into(),
                weight_key: "windyapp".into(),
                primary: Some(PrimaryApi::Windy),
            },
            SourceConfig {
                id: "windguru_86525".into(),
                name: "Windguru".into(),
                location: "Osório".into(),
                url: "https://www.windguru.cz/86525".into(),
                weight_key: "windguru".into(),
                primary: None,
            },
            SourceConfig {
                id: "windguru_119156".into(),
                name: "Windguru".into(),
                location: "Lagoa dos Barros".into(),
                url: "https://www.windguru.cz/119156".into(),
                weight_key: "windguru".into(),
                primary: None,
            },
            SourceConfig {
                id: "windfinder_osorio".into(),
                name: "Windfinder".into(),
                location: "Osório".into(),
                url: "https://www.windfinder.com/forecast/osorio_rio_grande_do_sul_brazil".into(),
                weight_key: "windfinder".into(),
                primary: None,
            },
        ];

        Self {
            title: default_title(),
            timezone: default_timezone(),
            utc_offset_minutes: default_utc_offset_minutes(),
            divergence_threshold_kmh: default_divergence(),
            calm_threshold_kmh: default_calm(),
            min_valid_points_for_average: default_min_points(),
            window_hours: default_window_hours(),
            http_timeout_secs: default_http_timeout_secs(),
            weights,
            sources,
            windy: WindyConfig::default(),
            open_meteo: OpenMeteoConfig::default(),
            generative: GenerativeConfig {
                region: "RS, Brazil".into(),
                ..GenerativeConfig::default()
            },
        }
    }

    /// Drop invalid weights and reset out-of-range thresholds.
    pub fn sanitized(mut self) -> Self {
        self.weights.retain(|key, w| {
            let keep = w.is_finite() && *w > 0.0;
            if !keep {
                warn!(target: "config", weight_key = %key, weight = *w, "dropping non-positive fusion weight");
            }
            keep
        });
        if !(self.divergence_threshold_kmh.is_finite() && self.divergence_threshold_kmh >= 0.0) {
            self.divergence_threshold_kmh = default_divergence();
        }
        if !(self.calm_threshold_kmh.is_finite() && self.calm_threshold_kmh >= 0.0) {
            self.calm_threshold_kmh = default_calm();
        }
        if !(1..=MAX_WINDOW_HOURS).contains(&self.window_hours) {
            warn!(target: "config", window_hours = self.window_hours, "window out of range, using default");
            self.window_hours = default_window_hours();
        }
        if self.http_timeout_secs == 0 {
            self.http_timeout_secs = default_http_timeout_secs();
        }
        // Offsets beyond ±18h are rejected by chrono; fall back to UTC.
        if self.utc_offset_minutes.unsigned_abs() >= 18 * 60 {
            warn!(target: "config", offset = self.utc_offset_minutes, "invalid utc offset, using 0");
            self.utc_offset_minutes = 0;
        }
        self.generative.sanitize();
        self
    }

    /// Fusion weight for a source id: source → weight key → weight.
    ///
    /// `None` when the source or its key is unknown; such records are skipped.
    pub fn weight_for_source(&self, source_id: &str) -> Option<f64> {
        let src = self.sources.iter().find(|s| s.id == source_id)?;
        self.weights.get(&src.weight_key).copied()
    }

    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self::default_seed()
    }
}

/// Resolve a secret that may be the literal "ENV" (read from `env_name`).
/// Empty values resolve to `None`.
pub(crate) fn resolve_secret(raw: &str, env_name: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("env") {
        return std::env::var(env_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
    }
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_weights_resolve_through_weight_key() {
        let cfg = FusionConfig::default_seed();
        assert_eq!(cfg.weight_for_source("windyapp_osorio"), Some(1.2));
        assert_eq!(cfg.weight_for_source("windguru_119156"), Some(1.0));
        assert_eq!(cfg.weight_for_source("unknown"), None);
    }

    #[test]
    fn sanitize_drops_bad_weights_and_thresholds() {
        let toml = r#"
divergence_threshold_kmh = -1.0
window_hours = 0

[weights]
good = 1.5
zero = 0.0
negative = -2.0
"#;
        let cfg = FusionConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.weights.len(), 1);
        assert_eq!(cfg.weights.get("good"), Some(&1.5));
        assert_eq!(cfg.divergence_threshold_kmh, DEFAULT_DIVERGENCE_THRESHOLD_KMH);
        assert_eq!(cfg.window_hours, 24);
    }

    #[test]
    fn sanitize_resets_extreme_window_and_offset() {
        let cfg = FusionConfig::from_toml_str(
            "window_hours = 10000000000000\nutc_offset_minutes = -2147483648\n",
        )
        .unwrap();
        assert_eq!(cfg.window_hours, 24);
        assert_eq!(cfg.utc_offset_minutes, 0);

        let cfg = FusionConfig::from_toml_str("window_hours = 168").unwrap();
        assert_eq!(cfg.window_hours, MAX_WINDOW_HOURS);
        let cfg = FusionConfig::from_toml_str("window_hours = 169").unwrap();
        assert_eq!(cfg.window_hours, 24);
    }

    #[test]
    fn literal_secret_passes_through() {
        assert_eq!(resolve_secret("abc", "UNUSED_VAR"), Some("abc".into()));
        assert_eq!(resolve_secret("  ", "UNUSED_VAR"), None);
    }

    #[test]
    fn offset_matches_minutes() {
        let cfg = FusionConfig::default_seed();
        assert_eq!(cfg.offset().local_minus_utc(), -3 * 3600);
    }
}
