//! OpenAI-compatible chat-completions client

use paperflow_core::{HttpError, ItemError, error_for_status, http_client, retry_with_backoff};
use serde::{Deserialize, Serialize};

/// Endpoint and model settings for the chat API.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API root, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    /// Sent as a bearer token when set
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Retries for rate limits, 5xx and transport errors
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_tokens: None,
            max_retries: 3,
        }
    }
}

/// Something that turns a system + user prompt into a reply.
#[allow(async_fn_in_trait)]
pub trait Completion {
    async fn complete(&self, system: &str, user: &str) -> Result<String, ItemError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

pub struct ChatClient {
    config: LlmConfig,
    url: String,
}

impl ChatClient {
    pub fn new(config: LlmConfig) -> Self {
        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        Self { config, url }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete_once(&self, system: &str, user: &str) -> Result<String, ItemError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let mut req = http_client().post(&self.url).json(&body);
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await.map_err(|e| HttpError::from_reqwest(&e))?;
        let text = error_for_status(resp)
            .await?
            .text()
            .await
            .map_err(|e| HttpError::from_reqwest(&e))?;

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| ItemError::parse(format!("chat response: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ItemError::parse("empty completion"))
    }
}

impl Completion for ChatClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, ItemError> {
        retry_with_backoff("chat", self.config.max_retries, || {
            self.complete_once(system, user)
        })
        .await
    }
}
