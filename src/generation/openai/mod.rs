
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::prompt::{ChatMessage, Role};
use crate::config::LlmConfig;
use crate::{Result, VaultError};

/// Bearer token for the chat API. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    #[inline]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[inline]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    index: usize,
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    role: Role,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Token accounting reported by the API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub index: usize,
    pub message: ChatMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOutput {
    pub model: String,
    pub replies: Vec<ChatReply>,
    pub usage: Option<Usage>,
}

impl GeneratorOutput {
    /// Text of the first reply
    #[inline]
    pub fn first_text(&self) -> Option<&str> {
        self.replies.first().map(|r| r.message.content.as_str())
    }
}

/// Blocking client for an OpenAI-compatible `/v1/chat/completions` endpoint.
///
/// Failed requests are not retried.
#[derive(Debug, Clone)]
pub struct OpenAiChatGenerator {
    completions_url: Url,
    model: String,
    api_key: ApiKey,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    agent: ureq::Agent,
}

impl OpenAiChatGenerator {
    #[inline]
    pub fn new(config: &LlmConfig, api_key: ApiKey) -> Result<Self> {
        let completions_url = config
            .completions_url()
            .map_err(|e| VaultError::Config(e.to_string()))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            completions_url,
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            agent,
        })
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `messages` and collect every reply
    #[inline]
    pub fn run(&self, messages: &[ChatMessage]) -> Result<GeneratorOutput> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| VaultError::Llm(format!("Failed to serialize request: {}", e)))?;

        debug!(
            "Chat completion request to {} with {} messages",
            self.completions_url,
            messages.len()
        );

        let mut response = self
            .agent
            .post(self.completions_url.as_str())
            .header("Authorization", &format!("Bearer {}", self.api_key.expose()))
            .header("Content-Type", "application/json")
            .send(&request_json)
            .map_err(|e| VaultError::Network(format!("Chat completion request failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| VaultError::Network(format!("Failed to read response body: {}", e)))?;

        if !(200..300).contains(&status) {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map_or(body, |envelope| envelope.error.message);
            return Err(VaultError::LlmStatus { status, message });
        }

        let parsed: CompletionResponse = serde_json::from_str(&body)
            .map_err(|e| VaultError::Llm(format!("Failed to parse completion response: {}", e)))?;

        if parsed.choices.is_empty() {
            return Err(VaultError::Llm(
                "Completion response contained no choices".to_string(),
            ));
        }

        let replies: Vec<ChatReply> = parsed
            .choices
            .into_iter()
            .map(|choice| ChatReply {
                index: choice.index,
                message: ChatMessage {
                    role: choice.message.role,
                    content: choice.message.content.unwrap_or_default(),
                },
                finish_reason: choice.finish_reason,
            })
            .collect();

        if let Some(usage) = &parsed.usage {
            info!(
                "Chat completion used {} prompt and {} completion tokens",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(GeneratorOutput {
            model: parsed.model.unwrap_or_else(|| self.model.clone()),
            replies,
            usage: parsed.usage,
        })
    }
}
