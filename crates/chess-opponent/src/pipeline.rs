//! Move recommendation pipeline: prompt → completion → extraction → validation,
//! with the default move policy behind every failure.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use shakmaty::Chess;
use tracing::{debug, warn};

use crate::completion::{self, Completion, CompletionPrompt};
use crate::config::OpponentConfig;
use crate::error::AnalysisError;
use crate::extract::{extract_commentary, extract_free_text, extract_structured, match_legal};
use crate::fallback::default_move;
use crate::prompt::{build_prompt, AnalysisContext, PromptShape, MOVE_MARKER};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveSource {
    Structured,
    FreeText,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub commentary: String,
    /// Always a member of the legal moves it was chosen from
    #[serde(rename = "move")]
    pub mv: Option<String>,
    pub source: MoveSource,
}

pub struct Recommender {
    completion: Arc<dyn Completion>,
    timeout: Duration,
    style: Option<String>,
}

impl Recommender {
    pub fn new(completion: Arc<dyn Completion>, timeout: Duration) -> Self {
        Self {
            completion,
            timeout,
            style: None,
        }
    }

    pub fn from_config(config: &OpponentConfig) -> Result<Self, AnalysisError> {
        let completion = completion::from_config(config)?;
        Ok(Self::new(completion, config.timeout).with_style(config.style.clone()))
    }

    pub fn with_style(mut self, style: Option<String>) -> Self {
        self.style = style;
        self
    }

    pub fn style(&self) -> Option<String> {
        self.style.clone()
    }

    /// One bounded completion call. No retries.
    async fn call(&self, prompt: &CompletionPrompt) -> Result<String, AnalysisError> {
        debug!(prompt = %prompt.user, "requesting completion");
        let text = tokio::time::timeout(self.timeout, self.completion.complete(prompt))
            .await
            .map_err(|_| AnalysisError::Timeout(self.timeout))??;
        debug!(response = %text, "completion response");
        if text.trim().is_empty() {
            return Err(AnalysisError::EmptyCompletion);
        }
        Ok(text)
    }

    /// Recommend a move for the side to move in `pos`.
    pub async fn recommend(
        &self,
        pos: &Chess,
        legal: &[String],
        ctx: &AnalysisContext,
        shape: PromptShape,
    ) -> Recommendation {
        if legal.is_empty() {
            return Recommendation {
                commentary: "There are no legal moves in this position.".to_string(),
                mv: None,
                source: MoveSource::Fallback,
            };
        }

        let prompt = build_prompt(shape, pos, legal, ctx);
        let text = match self.call(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "analysis unavailable, using default move policy");
                return fallback(legal, format!("Analysis unavailable ({}).", e));
            }
        };

        if let Some(token) = extract_structured(&text) {
            if let Some(san) = match_legal(pos, legal, &token) {
                let commentary =
                    extract_commentary(&text).unwrap_or_else(|| strip_move_line(&text));
                return Recommendation {
                    commentary,
                    mv: Some(san),
                    source: MoveSource::Structured,
                };
            }
            warn!(token = %token, "structured move is not legal, scanning text");
        }

        let commentary = strip_move_line(&text);
        for token in extract_free_text(&text) {
            if let Some(san) = match_legal(pos, legal, &token) {
                return Recommendation {
                    commentary,
                    mv: Some(san),
                    source: MoveSource::FreeText,
                };
            }
        }

        warn!("completion named no legal move, using default move policy");
        fallback(legal, commentary)
    }

    /// Free-text answer about a position. Never fails.
    pub async fn chat(&self, pos: &Chess, legal: &[String], ctx: &AnalysisContext) -> String {
        let prompt = build_prompt(PromptShape::Chat, pos, legal, ctx);
        match self.call(&prompt).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "chat completion unavailable");
                format!("I can't look at the position right now ({}).", e)
            }
        }
    }
}

fn fallback(legal: &[String], commentary: String) -> Recommendation {
    let mv = default_move(legal);
    let note = match &mv {
        Some(m) => format!("Playing {} from the default move policy.", m),
        None => "No move available.".to_string(),
    };
    let commentary = if commentary.is_empty() {
        note
    } else {
        format!("{} {}", commentary, note)
    };
    Recommendation {
        commentary,
        mv,
        source: MoveSource::Fallback,
    }
}

/// Commentary without the trailing `MOVE:` line.
fn strip_move_line(text: &str) -> String {
    text.lines()
        .filter(|line| {
            !line
                .replace(['*', '`'], "")
                .trim_start()
                .to_ascii_uppercase()
                .starts_with(MOVE_MARKER)
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
