//! Analysis error types. Every variant means the analysis was unavailable; the
//! pipeline absorbs them into the default move policy.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Configuration error: {0}")]
    Config(&'static str),

    #[error("Completion endpoint not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Completion API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Completion returned no content")]
    EmptyCompletion,

    #[error("Completion timed out after {0:?}")]
    Timeout(Duration),
}
