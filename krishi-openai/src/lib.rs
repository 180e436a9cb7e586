//! OpenAI-compatible chat-completions transport.
//!
//! Implements [`LanguageModel`] over `POST {base_url}/chat/completions`, which
//! covers OpenAI itself and the many providers that mirror its API (Gemini's
//! OpenAI endpoint, Ollama, vLLM, OpenRouter and so on).
//!
//! The per-call timeout is enforced by [`LlmClient`](krishi_core::LlmClient);
//! this crate only speaks HTTP.
//!
//! # Example
//!
//! ```no_run
//! use krishi_core::{LlmClient, LlmConfig, LlmRequest};
//! use krishi_openai::OpenAiCompatible;
//!
//! # async fn example() -> Result<(), krishi_core::LlmError> {
//! let model = OpenAiCompatible::from_env()?;
//! let client = LlmClient::new(model, LlmConfig::default());
//! let text = client.generate(LlmRequest::new("When should I sow wheat?")).await?;
//! println!("{}", text);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use krishi_core::{truncate, LanguageModel, LlmError, LlmRequest};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "LLM_API_KEY";

/// Environment variable overriding the API base URL.
pub const ENV_BASE_URL: &str = "LLM_BASE_URL";

/// Environment variable overriding the model name.
pub const ENV_MODEL: &str = "LLM_DEFAULT_MODEL";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Longest error body kept in [`LlmError::Status`].
const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, PartialEq)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// A chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatible {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiCompatible {
    /// Create a transport for the default OpenAI endpoint.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: Some(api_key.into()),
            model: model.into(),
        }
    }

    /// Configure from `LLM_API_KEY`, `LLM_BASE_URL` and `LLM_DEFAULT_MODEL`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidRequest`] if the API key is missing and no
    /// custom base URL is set. Local servers usually need no key.
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = std::env::var(ENV_API_KEY).ok().filter(|k| !k.trim().is_empty());
        let base_url = std::env::var(ENV_BASE_URL).ok().filter(|u| !u.trim().is_empty());
        let model = std::env::var(ENV_MODEL)
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        if api_key.is_none() && base_url.is_none() {
            return Err(LlmError::InvalidRequest(format!(
                "{} is not set",
                ENV_API_KEY
            )));
        }

        Ok(Self {
            client: Client::new(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            model,
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Use a preconfigured reqwest client (proxies, TLS, connection pool).
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Drop the API key, for local servers that reject auth headers.
    #[must_use]
    pub fn without_api_key(mut self) -> Self {
        self.api_key = None;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// System instruction, then prior conversation, then the prompt.
fn build_messages(request: &LlmRequest) -> Vec<ChatMessage<'_>> {
    let mut messages = Vec::with_capacity(3);
    if let Some(system) = request.system_instruction.as_deref() {
        messages.push(ChatMessage {
            role: "system",
            content: system,
        });
    }
    if let Some(history) = request.history.as_deref() {
        messages.push(ChatMessage {
            role: "system",
            content: history,
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: &request.prompt,
    });
    messages
}

fn extract_text(response: ChatResponse) -> Result<String, LlmError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(LlmError::NoContent)
}

fn status_error(status: StatusCode, body: &str) -> LlmError {
    let body = truncate(body, MAX_ERROR_BODY_CHARS);
    if status == StatusCode::TOO_MANY_REQUESTS {
        LlmError::RateLimit(body)
    } else {
        LlmError::Status {
            status: status.as_u16(),
            body,
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatible {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: LlmRequest) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: build_messages(&request),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let mut http = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key);
        }

        let response = http.send().await.map_err(|e| {
            if e.is_connect() {
                LlmError::Other(format!("Failed to connect: {}", e))
            } else {
                LlmError::Other(format!("HTTP request failed: {}", e))
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::ResponseProcessing(format!("Failed to read body: {}", e)))?;

        if !status.is_success() {
            log::warn!("{} returned HTTP {}", self.endpoint(), status.as_u16());
            return Err(status_error(status, &text));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| LlmError::ResponseProcessing(format!("Invalid JSON: {}", e)))?;
        extract_text(parsed)
    }
}
