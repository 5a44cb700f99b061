//! Opponent configuration from environment variables

use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct OpponentConfig {
    /// Base URL of an OpenAI-compatible API; None runs the opponent offline
    pub api_url: Option<String>,

    pub api_key: Option<String>,

    pub model: String,

    pub temperature: f64,

    pub max_tokens: u32,

    /// Upper bound on a single completion call
    pub timeout: Duration,

    /// Free-text playing style injected into every prompt
    pub style: Option<String>,
}

impl OpponentConfig {
    pub fn from_env() -> Self {
        Self {
            api_url: env::var("COMPLETION_API_URL").ok().filter(|v| !v.trim().is_empty()),
            api_key: env::var("COMPLETION_API_KEY").ok().filter(|v| !v.trim().is_empty()),
            model: env::var("COMPLETION_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            temperature: env::var("COMPLETION_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.7),
            max_tokens: env::var("COMPLETION_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(512),
            timeout: Duration::from_secs(
                env::var("COMPLETION_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
            style: env::var("OPPONENT_STYLE").ok().filter(|v| !v.trim().is_empty()),
        }
    }
}

impl Default for OpponentConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 512,
            timeout: Duration::from_secs(30),
            style: None,
        }
    }
}
