//! Generative fallback: asks a text model for a plausible multi-hour forecast
//! and extracts the JSON array of records from its free-form answer.
//!
//! Two backends share the same [`TextGenerator`] seam: Gemini (with optional
//! search grounding) and OpenAI chat completions. A disabled generator is used
//! when the feature is off, so the orchestrator path stays identical.

use async_trait::async_trait;
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{GenerativeConfig, SourceConfig};
use crate::error::{SourceError, SourceResult};
use crate::ingest::types::{ForecastProvider, RawRecord};

/// Low-level text model call. Returns the raw answer text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> SourceResult<String>;
    fn name(&self) -> &'static str;
}

pub type DynTextGenerator = Arc<dyn TextGenerator>;

/// Factory: build a generator according to config and environment.
pub fn build_generator(cfg: &GenerativeConfig, timeout: Duration) -> SourceResult<DynTextGenerator> {
    if !cfg.enabled {
        return Ok(Arc::new(DisabledGenerator));
    }
    let api_key = cfg.resolved_api_key();
    match cfg.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiGenerator::new(
            api_key,
            &cfg.model,
            timeout,
        )?)),
        "gemini" => Ok(Arc::new(GeminiGenerator::new(
            api_key,
            &cfg.model,
            cfg.grounding,
            timeout,
        )?)),
        other => {
            tracing::warn!(target: "ingest", provider = other, "unknown generative provider, disabling");
            Ok(Arc::new(DisabledGenerator))
        }
    }
}

fn http_client(timeout: Duration) -> SourceResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(super::USER_AGENT)
        .connect_timeout(Duration::from_secs(5))
        .timeout(timeout)
        .build()?)
}

// ------------------------------------------------------------
// Gemini
// ------------------------------------------------------------

pub struct GeminiGenerator {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    grounding: bool,
}

impl GeminiGenerator {
    pub fn new(
        api_key: Option<String>,
        model: &str,
        grounding: bool,
        timeout: Duration,
    ) -> SourceResult<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key,
            model: model.to_string(),
            grounding,
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> SourceResult<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(SourceError::MissingApiKey("gemini"))?;

        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            contents: Vec<Content<'a>>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            tools: Vec<serde_json::Value>,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: Option<RespContent>,
        }
        #[derive(Deserialize)]
        struct RespContent {
            #[serde(default)]
            parts: Vec<RespPart>,
        }
        #[derive(Deserialize)]
        struct RespPart {
            text: Option<String>,
        }

        let tools = if self.grounding {
            vec![serde_json::json!({ "google_search": {} })]
        } else {
            Vec::new()
        };
        let req = Req {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            tools,
        };
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );

        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", key)
            .json(&req)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SourceError::Status(resp.status().as_u16()));
        }
        let body: Resp = resp.json().await?;
        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(SourceError::InvalidPayload("empty gemini answer".into()));
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

// ------------------------------------------------------------
// OpenAI
// ------------------------------------------------------------

/// OpenAI provider (Chat Completions API).
pub struct OpenAiGenerator {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: Option<String>, model: &str, timeout: Duration) -> SourceResult<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> SourceResult<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(SourceError::MissingApiKey("openai"))?;

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: Option<String>,
        }

        let sys = "You are a marine wind forecaster. Answer with a JSON array only.";
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: sys,
                },
                Msg {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.2,
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(key)
            .json(&req)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SourceError::Status(resp.status().as_u16()));
        }
        let body: Resp = resp.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| SourceError::InvalidPayload("empty openai answer".into()))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Always fails; used when generation is disabled.
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    async fn generate(&self, _prompt: &str) -> SourceResult<String> {
        Err(SourceError::Disabled("generative"))
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

// ------------------------------------------------------------
// Forecast provider on top of a generator
// ------------------------------------------------------------

pub struct GenerativeProvider {
    generator: DynTextGenerator,
    region: String,
    forecast_hours: u32,
}

impl GenerativeProvider {
    pub fn new(generator: DynTextGenerator, cfg: &GenerativeConfig) -> Self {
        Self {
            generator,
            region: cfg.region.clone(),
            forecast_hours: cfg.forecast_hours,
        }
    }
}

/// Prompt describing the location, the reference model and the exact record shape.
pub fn build_prompt(source: &SourceConfig, region: &str, hours: u32) -> String {
    let place = if region.trim().is_empty() {
        source.location.clone()
    } else {
        format!("{}, {}", source.location, region.trim())
    };
    format!(
        "Generate a realistic {hours}-hour hourly wind forecast for {place}, based on the {model} forecast model. \
Use current information from the web to ground the forecast. \
Return the data as a JSON array of objects, one per hour, each with exactly this structure: \
{{ \"time_utc\": \"string (ISO 8601, UTC)\", \"sustained\": {{ \"value\": number, \"unit\": \"knots\" }}, \
\"gust\": {{ \"value\": number, \"unit\": \"knots\" }}, \"direction\": {{ \"degrees\": number }} }}.",
        model = source.name,
    )
}

fn fenced_block_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)\s*```").expect("fence regex"))
}

/// Byte length of the balanced `[...]` starting at `s[0]`, ignoring brackets
/// inside JSON strings. `None` when it never closes.
fn balanced_array_len(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_str = false;
    let mut escaped = false;
    for (i, ch) in s.char_indices() {
        if in_str {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_str = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_str = true,
            '[' => depth += 1,
            ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Every top-level balanced `[...]` in `s`, in order of appearance.
fn bare_arrays(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut pos = 0;
    while let Some(rel) = s[pos..].find('[') {
        let start = pos + rel;
        match balanced_array_len(&s[start..]) {
            Some(len) => {
                out.push(&s[start..start + len]);
                pos = start + len;
            }
            None => pos = start + 1,
        }
    }
    out
}

/// Candidate JSON arrays in model output: arrays inside fenced blocks first,
/// then every bare array in the whole text.
pub fn json_array_candidates(text: &str) -> Vec<&str> {
    let mut out: Vec<&str> = fenced_block_re()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .flat_map(|body| bare_arrays(body.as_str()))
        .collect();
    out.extend(bare_arrays(text));
    out
}

/// First candidate array (see [`json_array_candidates`]).
pub fn extract_json_array(text: &str) -> Option<&str> {
    json_array_candidates(text).into_iter().next()
}

/// Parse generated text into records stamped with `source_id`.
///
/// Candidates are tried in order and the first one yielding at least one
/// record wins, so citation markers like `[1]` in the prose are skipped.
/// Elements that do not match the record shape are dropped. No array at all
/// is `NoJsonArray`; arrays that are all invalid JSON give the last parse
/// error; valid arrays without usable records give `Empty`.
pub fn parse_generated_records(text: &str, source_id: &str) -> SourceResult<Vec<RawRecord>> {
    let candidates = json_array_candidates(text);
    if candidates.is_empty() {
        return Err(SourceError::NoJsonArray);
    }

    let mut last_parse_err = None;
    let mut saw_valid_array = false;
    for json in candidates {
        let items: Vec<serde_json::Value> = match serde_json::from_str(json) {
            Ok(items) => items,
            Err(e) => {
                last_parse_err = Some(e);
                continue;
            }
        };
        saw_valid_array = true;

        let total = items.len();
        let mut out = Vec::with_capacity(total);
        for item in items {
            match serde_json::from_value::<RawRecord>(item) {
                Ok(mut rec) => {
                    rec.source = source_id.to_string();
                    out.push(rec);
                }
                Err(e) => tracing::debug!(target: "ingest", source = source_id, error = %e, "skipping generated element"),
            }
        }
        if out.is_empty() {
            continue;
        }
        let skipped = total - out.len();
        if skipped > 0 {
            counter!("fusion_records_dropped_total").increment(skipped as u64);
        }
        return Ok(out);
    }

    match last_parse_err {
        Some(e) if !saw_valid_array => Err(SourceError::Parse(e)),
        _ => Err(SourceError::Empty),
    }
}

#[async_trait]
impl ForecastProvider for GenerativeProvider {
    async fn fetch_records(&self, source: &SourceConfig) -> SourceResult<Vec<RawRecord>> {
        let prompt = build_prompt(source, &self.region, self.forecast_hours);
        let text = self.generator.generate(&prompt).await?;
        parse_generated_records(&text, &source.id)
    }

    fn name(&self) -> &'static str {
        "generative"
    }
}
