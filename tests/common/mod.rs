#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chess_opponent::{AnalysisError, Completion, CompletionPrompt, Recommender};
use server::config::HumanColor;
use server::orchestrator::Orchestrator;
use server::session::SessionManager;

/// Completion double that replays canned replies in order, then reports itself
/// unavailable. Every prompt it receives is kept for inspection.
#[derive(Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<CompletionPrompt>>,
}

impl ScriptedCompletion {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<CompletionPrompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Completion for ScriptedCompletion {
    async fn complete(&self, prompt: &CompletionPrompt) -> Result<String, AnalysisError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(AnalysisError::NotConfigured)
    }
}

/// Completion double that answers every prompt with the same reply after a delay.
pub struct SlowCompletion {
    reply: String,
    delay: Duration,
}

impl SlowCompletion {
    pub fn new(reply: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            delay,
        })
    }
}

#[async_trait]
impl Completion for SlowCompletion {
    async fn complete(&self, _prompt: &CompletionPrompt) -> Result<String, AnalysisError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.reply.clone())
    }
}

pub fn recommender(completion: Arc<ScriptedCompletion>) -> Recommender {
    Recommender::new(completion, Duration::from_secs(5))
}

pub fn sessions(replies: &[&str]) -> SessionManager {
    SessionManager::new(Arc::new(recommender(ScriptedCompletion::new(replies))))
}

pub fn orchestrator(replies: &[&str]) -> Orchestrator {
    Orchestrator::new(Arc::new(sessions(replies)))
}

pub fn orchestrator_as(color: HumanColor, replies: &[&str]) -> Orchestrator {
    orchestrator(replies).with_human_color(color)
}
