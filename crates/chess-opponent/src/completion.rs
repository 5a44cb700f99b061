//! Text completion capability: "given a prompt, return text".

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::OpponentConfig;
use crate::error::AnalysisError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionPrompt {
    pub system: String,
    pub user: String,
}

#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, prompt: &CompletionPrompt) -> Result<String, AnalysisError>;
}

/// Pick the completion backend described by the config.
pub fn from_config(config: &OpponentConfig) -> Result<Arc<dyn Completion>, AnalysisError> {
    if config.api_url.is_none() {
        info!("COMPLETION_API_URL not set - opponent plays from the default move policy");
        return Ok(Arc::new(OfflineCompletion));
    }
    Ok(Arc::new(OpenAiCompletion::new(config)?))
}

/// Backend used when no endpoint is configured. Always unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineCompletion;

#[async_trait]
impl Completion for OfflineCompletion {
    async fn complete(&self, _prompt: &CompletionPrompt) -> Result<String, AnalysisError> {
        Err(AnalysisError::NotConfigured)
    }
}

/// OpenAI-compatible chat completions client.
#[derive(Debug, Clone)]
pub struct OpenAiCompletion {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl OpenAiCompletion {
    pub fn new(config: &OpponentConfig) -> Result<Self, AnalysisError> {
        let base_url = config
            .api_url
            .as_deref()
            .ok_or(AnalysisError::Config("COMPLETION_API_URL not set"))?
            .trim_end_matches('/')
            .to_string();

        // The pipeline applies its own deadline; this one only guards the socket.
        let client = Client::builder()
            .user_agent("LlmChess/1.0")
            .timeout(config.timeout + Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[async_trait]
impl Completion for OpenAiCompletion {
    async fn complete(&self, prompt: &CompletionPrompt) -> Result<String, AnalysisError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(prompt.system.clone()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(prompt.user.clone()),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let mut builder = self.client.post(self.endpoint()).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = resp.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        debug!(chars = content.len(), "completion received");
        if content.trim().is_empty() {
            return Err(AnalysisError::EmptyCompletion);
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = OpponentConfig {
            api_url: Some("http://localhost:11434/v1/".to_string()),
            ..OpponentConfig::default()
        };
        let client = OpenAiCompletion::new(&config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn test_missing_url_is_config_error() {
        let err = OpenAiCompletion::new(&OpponentConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::Config(_)));
    }

    #[tokio::test]
    async fn test_offline_is_unavailable() {
        let prompt = CompletionPrompt {
            system: String::new(),
            user: "e4?".to_string(),
        };
        assert!(matches!(
            OfflineCompletion.complete(&prompt).await,
            Err(AnalysisError::NotConfigured)
        ));
    }
}
