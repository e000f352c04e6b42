//! Error types for source acquisition.
//!
//! Every variant is a per-source failure: it is logged, recorded as
//! `SourceStatus { status: failure }` and never propagated past the orchestrator.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status from a collaborator.
    #[error("request failed with status {0}")]
    Status(u16),

    /// Response decoded but had an unusable shape.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("missing api key for {0}")]
    MissingApiKey(&'static str),

    #[error("provider disabled: {0}")]
    Disabled(&'static str),

    /// Strategy succeeded but produced zero records.
    #[error("no records returned")]
    Empty,

    /// Generated text contained no JSON array.
    #[error("no JSON array found in generated text")]
    NoJsonArray,

    #[error("json parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// No provider registered for the configured primary strategy.
    #[error("no provider registered for {0}")]
    Unregistered(String),

    /// The acquisition task itself died (panic or cancellation).
    #[error("acquisition task failed: {0}")]
    TaskPanicked(String),
}

pub type SourceResult<T> = Result<T, SourceError>;
