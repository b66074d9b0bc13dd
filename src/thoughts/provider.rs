use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::ThoughtConfig;

const SYSTEM_PROMPT: &str = "You reconstruct the private reasoning of a tool-using agent. \
Given the task, the steps so far and the action the agent took next, reply with one or two \
sentences of first-person reasoning that justify that action. Reply with the reasoning only.";

#[derive(Debug, Error)]
pub enum ThoughtError {
    #[error("thought provider misconfigured: {0}")]
    Config(String),
    #[error("thought request failed: {0}")]
    Http(String),
    #[error("thought provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("thought provider returned no content")]
    EmptyResponse,
}

impl ThoughtError {
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }
}

/// Everything a provider sees about one action lacking a description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThoughtRequest {
    pub episode_id: String,
    pub step_index: usize,
    pub goal: Option<String>,
    /// One line per earlier step.
    pub history: Vec<String>,
    /// The action, as canonical JSON.
    pub action: String,
}

impl ThoughtRequest {
    pub fn user_prompt(&self) -> String {
        let mut prompt = String::new();
        if let Some(goal) = self.goal.as_deref() {
            prompt.push_str("Task: ");
            prompt.push_str(goal);
            prompt.push_str("\n\n");
        }
        if !self.history.is_empty() {
            prompt.push_str("Steps so far:\n");
            for line in &self.history {
                prompt.push_str("- ");
                prompt.push_str(line);
                prompt.push('\n');
            }
            prompt.push('\n');
        }
        prompt.push_str("Next action:\n");
        prompt.push_str(&self.action);
        prompt
    }
}

/// Text generation backend for thought synthesis.
#[async_trait]
pub trait ThoughtProvider: Send + Sync {
    async fn generate(&self, request: &ThoughtRequest) -> Result<String, ThoughtError>;
}

/// Provider for any OpenAI-compatible chat-completions endpoint.
pub struct OpenAiThoughtProvider {
    client: Client,
    config: ThoughtConfig,
    api_key: String,
}

impl OpenAiThoughtProvider {
    pub fn new(config: ThoughtConfig) -> Result<Self, ThoughtError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ThoughtError::Config(format!("environment variable {} is not set", config.api_key_env))
            })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| ThoughtError::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }
}

#[async_trait]
impl ThoughtProvider for OpenAiThoughtProvider {
    async fn generate(&self, request: &ThoughtRequest) -> Result<String, ThoughtError> {
        let url = format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'));
        let body = ChatCompletionRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: request.user_prompt(),
                },
            ],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| ThoughtError::http(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            return Err(ThoughtError::Status { status, body });
        }

        let response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| ThoughtError::http(format!("invalid response: {err}")))?;
        let thought = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(ThoughtError::EmptyResponse)?;
        debug!(
            episode = %request.episode_id,
            step = request.step_index,
            chars = thought.len(),
            "thought generated"
        );
        Ok(thought)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    #[serde(default)]
    content: Option<String>,
}
