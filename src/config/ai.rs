// src/config/ai.rs
use serde::{Deserialize, Serialize};

use super::resolve_secret;

fn default_enabled() -> bool {
    true
}
fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_forecast_hours() -> u32 {
    72
}

/// Generative fallback settings (`[generative]` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerativeConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// "gemini" | "openai" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from GEMINI_API_KEY / OPENAI_API_KEY (by provider)
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// Appended to the location in prompts, e.g. "RS, Brazil".
    #[serde(default)]
    pub region: String,
    #[serde(default = "default_forecast_hours")]
    pub forecast_hours: u32,
    /// Ask the model to ground the forecast with web search (Gemini only).
    #[serde(default = "default_enabled")]
    pub grounding: bool,
}

impl Default for GenerativeConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            provider: default_provider(),
            model: default_model(),
            api_key: default_api_key(),
            region: String::new(),
            forecast_hours: default_forecast_hours(),
            grounding: true,
        }
    }
}

impl GenerativeConfig {
    pub(crate) fn sanitize(&mut self) {
        self.provider = self.provider.trim().to_lowercase();
        if self.model.trim().is_empty() {
            self.model = match self.provider.as_str() {
                "openai" => "gpt-4o-mini".to_string(),
                _ => default_model(),
            };
        }
        if !(1..=168).contains(&self.forecast_hours) {
            self.forecast_hours = default_forecast_hours();
        }
    }

    /// Env var consulted when `api_key = "ENV"`.
    pub fn api_key_env(&self) -> &'static str {
        match self.provider.as_str() {
            "openai" => "OPENAI_API_KEY",
            _ => "GEMINI_API_KEY",
        }
    }

    pub fn resolved_api_key(&self) -> Option<String> {
        resolve_secret(&self.api_key, self.api_key_env())
    }
}
