// src/answers/llm_client.rs
//! Chat completion client for OpenAI-compatible APIs

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::app_log;
use crate::core::config_manager::LlmSettings;

const CHAT_COMPLETIONS_ENDPOINT: &str = "/chat/completions";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("LLM API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Giving up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

/// Anything able to turn a prompt into a completion.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub default_retry: Duration,
}

impl LlmClientConfig {
    pub fn new(api_key: &str, base_url: &str, model: &str, settings: &LlmSettings) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout: Duration::from_secs(settings.timeout_secs),
            max_retries: settings.max_retries.max(1),
            default_retry: Duration::from_secs(settings.default_retry_secs),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

pub struct OpenAiChatClient {
    client: Client,
    config: LlmClientConfig,
}

impl OpenAiChatClient {
    pub fn new(config: LlmClientConfig) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    async fn send_once(&self, prompt: &str) -> Result<String, Attempt> {
        let url = format!("{}{}", self.config.base_url, CHAT_COMPLETIONS_ENDPOINT);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Attempt::Retry(LlmError::Http(e), self.config.default_retry))?;

        let status = response.status();
        if !status.is_success() {
            let wait = retry_delay(status, response.headers(), self.config.default_retry);
            let body = response.text().await.unwrap_or_default();
            let error = if status == StatusCode::TOO_MANY_REQUESTS {
                LlmError::RateLimited(body)
            } else {
                LlmError::Api {
                    status: status.as_u16(),
                    body,
                }
            };
            return Err(if status == StatusCode::UNAUTHORIZED {
                Attempt::Fatal(error)
            } else {
                Attempt::Retry(error, wait)
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Attempt::Retry(LlmError::InvalidResponse(e.to_string()), self.config.default_retry))?;

        let usage = parsed.usage.unwrap_or_default();
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Attempt::Fatal(LlmError::InvalidResponse("no choices returned".to_string())))?;

        app_log!(
            debug,
            "LLM reply id={} model={} finish_reason={} tokens={}/{}/{}",
            parsed.id.unwrap_or_default(),
            parsed.model.unwrap_or_default(),
            choice.finish_reason.unwrap_or_default(),
            usage.prompt_tokens,
            usage.completion_tokens,
            usage.total_tokens
        );

        Ok(choice.message.content.unwrap_or_default())
    }
}

enum Attempt {
    Retry(LlmError, Duration),
    Fatal(LlmError),
}

/// How long to wait before retrying a failed call with this status.
pub fn retry_delay(status: StatusCode, headers: &HeaderMap, default: Duration) -> Duration {
    if status != StatusCode::TOO_MANY_REQUESTS {
        return default;
    }

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .and_then(|value| value.parse::<f64>().ok())
            .filter(|value| *value >= 0.0)
    };

    // Out-of-range values (inf, 1e20) fall back to the default
    let seconds = header("retry-after").and_then(|seconds| Duration::try_from_secs_f64(seconds).ok());
    let millis = || header("retry-after-ms").and_then(|millis| Duration::try_from_secs_f64(millis / 1000.0).ok());
    seconds.or_else(millis).unwrap_or(default)
}

/// Call `attempt` until it succeeds, fails fatally or `max_retries` attempts are used.
async fn with_retries<F, Fut>(max_retries: u32, mut attempt: F) -> Result<String, LlmError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<String, Attempt>>,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        match attempt().await {
            Ok(reply) => return Ok(reply),
            Err(Attempt::Fatal(error)) => return Err(error),
            Err(Attempt::Retry(error, wait)) => {
                if attempts >= max_retries {
                    return Err(LlmError::RetriesExhausted {
                        attempts,
                        last: error.to_string(),
                    });
                }
                app_log!(
                    warn,
                    "LLM call failed ({}), retrying in {:.1}s [{}/{}]",
                    error,
                    wait.as_secs_f64(),
                    attempts,
                    max_retries
                );
                tokio::time::sleep(wait).await;
            }
        }
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        with_retries(self.config.max_retries, move || self.send_once(prompt)).await
    }
}
