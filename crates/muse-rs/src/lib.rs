//! Creative-writing mentor built around a persisted session and a
//! genre/mode-aware instruction composer.
//!
//! `muse-rs` holds one user's writing session (the conversation, the
//! selected genre, creative projects with their chapters, and writing goals)
//! and forwards conversation turns to an OpenAI-compatible generation service
//! after composing an instruction prompt for the active genre and mode.
//!
//! # Getting started
//!
//! ```ignore
//! use muse_rs::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     let config = MuseConfig::from_env();
//!     let store = Arc::new(SessionStore::open(&config.storage_path));
//!     let client = OpenAiClient::from_config(&config)?;
//!
//!     let conversation = Conversation::new(client, store.clone(), config);
//!     let reply = conversation
//!         .send(Mode::InteractiveStory, "I open a mysterious door.")
//!         .await;
//!
//!     if let Some(reply) = reply {
//!         println!("{}", reply.content);
//!     }
//!     store.close();
//!     Ok(())
//! }
//! ```
//!
//! # Where to find things
//!
//! - **Instruction text for a genre and mode:** [`prompt::compose_instruction`]
//!   and [`prompt::assemble_request`]. Genres and modes live in
//!   [`prompt::catalog`].
//! - **Session state:** [`SessionStore`](store::SessionStore) owns the
//!   [`Session`](store::Session) aggregate. Observe mutations with a
//!   [`StoreObserver`](store::StoreObserver).
//! - **Running a turn:** [`Conversation`](conversation::Conversation) appends
//!   the user turn, calls the service and writes back the reply or an apology.
//! - **Talking to the service:** [`OpenAiClient`] implements
//!   [`GenerationService`](api::GenerationService).
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`prompt`] | Genre/mode catalog, instruction builder, request and image-prompt assembly |
//! | [`store`] | Session aggregate, monotonic clock, versioned persistence, observers |
//! | [`conversation`] | Serialized turn driver and scene illustration |
//! | [`api`] | `GenerationService` trait and boundary error type |
//! | [`config`] | `MuseConfig` defaults and environment overlay |

pub mod api;
pub mod config;
pub mod conversation;
pub mod prelude;
pub mod prompt;
pub mod store;

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::api::GenerationError;

// ── Constants ──────────────────────────────────────────────────────

/// Base URL of the OpenAI-compatible API.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default image model.
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";

/// Sampling temperature for story turns.
pub const DEFAULT_TEMPERATURE: f32 = 0.8;

/// Maximum output tokens per reply.
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Fixed output resolution for scene illustrations.
pub const IMAGE_SIZE: &str = "1024x1024";

/// Image quality tier.
pub const IMAGE_QUALITY: &str = "standard";

/// Default HTTP timeout for a single generation call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

// ── Request types ──────────────────────────────────────────────────

/// Role of an entry in the outbound payload.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatRole::System => write!(f, "system"),
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry of the outbound message sequence.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Chat completion request body.
#[derive(Serialize, Debug, Clone, Default)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "is_zero_u32")]
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Image generation request body.
#[derive(Serialize, Debug, Clone)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    pub n: u32,
    pub size: String,
    pub quality: String,
}

impl ImageRequest {
    /// One image at the fixed resolution and quality.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            n: 1,
            size: IMAGE_SIZE.to_string(),
            quality: IMAGE_QUALITY.to_string(),
        }
    }
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

// ── Response types ─────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawImageResponse {
    data: Option<Vec<RawImage>>,
    error: Option<ApiErrorResponse>,
}

#[derive(Deserialize, Debug)]
struct RawImage {
    url: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Clean return type from [`OpenAiClient::chat`].
#[derive(Debug)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub usage: Option<UsageInfo>,
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for the chat-completions and image-generation endpoints.
pub struct OpenAiClient {
    pub(crate) client: reqwest::Client,
    pub(crate) api_key: String,
    pub(crate) base_url: String,
}

impl OpenAiClient {
    /// Create a client against the public API with the default timeout.
    pub fn new(api_key: impl Into<String>) -> Result<Self, String> {
        Self::with_base_url(
            api_key,
            OPENAI_API_BASE,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Create a client against any OpenAI-compatible base URL.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent("muse-rs/0.1")
            .timeout(timeout)
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        let base_url: String = base_url.into();
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build a client from the API key, base URL and timeout in `config`.
    pub fn from_config(config: &config::MuseConfig) -> Result<Self, String> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| "OPENAI_API_KEY not set".to_string())?;
        Self::with_base_url(
            api_key,
            config.api_base.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Send a chat completion request.
    pub async fn chat(&self, body: &ChatRequest) -> Result<ChatCompletion, GenerationError> {
        debug!(
            "LLM request: model={}, messages={}, max_tokens={}, temp={}",
            body.model,
            body.messages.len(),
            body.max_tokens,
            body.temperature,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();
        let text = self.post_json("chat/completions", body).await?;
        debug!(
            "LLM response in {:.1}s ({} bytes)",
            start.elapsed().as_secs_f64(),
            text.len()
        );

        let parsed: RawChatResponse = serde_json::from_str(&text)
            .map_err(|e| GenerationError::Malformed(format!("chat response: {e}")))?;

        if let Some(err) = parsed.error {
            return Err(GenerationError::Malformed(format!(
                "API error payload: {}",
                err.message
            )));
        }

        if let Some(ref usage) = parsed.usage {
            debug!(
                "Token usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens.unwrap_or(0),
                usage.completion_tokens.unwrap_or(0),
                usage.total_tokens.unwrap_or(0),
            );
        }

        let choice = parsed.choices.and_then(|c| c.into_iter().next());
        Ok(match choice {
            Some(c) => ChatCompletion {
                content: c.message.content,
                usage: parsed.usage,
                finish_reason: c.finish_reason,
            },
            None => ChatCompletion {
                content: None,
                usage: parsed.usage,
                finish_reason: None,
            },
        })
    }

    /// Request one image and return its URL.
    pub async fn generate_image(&self, body: &ImageRequest) -> Result<String, GenerationError> {
        debug!(
            "Image request: model={}, size={}, prompt={} chars",
            body.model,
            body.size,
            body.prompt.chars().count()
        );

        let text = self.post_json("images/generations", body).await?;
        let parsed: RawImageResponse = serde_json::from_str(&text)
            .map_err(|e| GenerationError::Malformed(format!("image response: {e}")))?;

        if let Some(err) = parsed.error {
            return Err(GenerationError::Malformed(format!(
                "API error payload: {}",
                err.message
            )));
        }

        parsed
            .data
            .and_then(|d| d.into_iter().next())
            .and_then(|img| img.url)
            .filter(|url| !url.is_empty())
            .ok_or(GenerationError::Empty)
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<String, GenerationError> {
        let resp = self
            .client
            .post(format!("{}/{path}", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| GenerationError::Network(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}
