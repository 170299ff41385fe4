//! Mentor configuration with sensible defaults.
//!
//! [`MuseConfig`] carries the generation parameters, the API endpoint and the
//! storage location. [`MuseConfig::from_env`] overlays `MUSE_*` environment
//! variables on the defaults; the CLI then overrides individual fields.

use std::path::PathBuf;
use tracing::warn;

use crate::store::default_file_name;
use crate::{
    ChatMessage, ChatRequest, DEFAULT_IMAGE_MODEL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
    DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS, ImageRequest, OPENAI_API_BASE,
};

/// Configuration for a mentor session.
#[derive(Debug, Clone, PartialEq)]
pub struct MuseConfig {
    /// Chat model identifier. Default: `"gpt-4o"`.
    pub model: String,
    /// Image model identifier. Default: `"dall-e-3"`.
    pub image_model: String,
    /// Sampling temperature. Default: `0.8`.
    pub temperature: f32,
    /// Maximum tokens per reply. Default: `2000`.
    pub max_tokens: u32,
    /// Base URL of the OpenAI-compatible API.
    pub api_base: String,
    /// API key. Read from `OPENAI_API_KEY`; never persisted.
    pub api_key: Option<String>,
    /// Per-request timeout in seconds. Default: `120`.
    pub timeout_secs: u64,
    /// Session blob location. Default: `./creative-mentor-storage.json`.
    pub storage_path: PathBuf,
    /// Keep only the most recent N stored messages in each request.
    /// Default: `None` (unbounded).
    pub history_window: Option<usize>,
}

impl Default for MuseConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            api_base: OPENAI_API_BASE.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            storage_path: PathBuf::from(default_file_name()),
            history_window: None,
        }
    }
}

impl MuseConfig {
    /// Defaults overlaid with the process environment.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `OPENAI_API_KEY` | `api_key` |
    /// | `MUSE_MODEL` | `model` |
    /// | `MUSE_IMAGE_MODEL` | `image_model` |
    /// | `MUSE_TEMPERATURE` | `temperature` |
    /// | `MUSE_MAX_TOKENS` | `max_tokens` |
    /// | `MUSE_API_BASE` | `api_base` |
    /// | `MUSE_TIMEOUT_SECS` | `timeout_secs` |
    /// | `MUSE_STORAGE` | `storage_path` |
    /// | `MUSE_HISTORY_WINDOW` | `history_window` |
    ///
    /// Unparseable numbers are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        config.api_key = var("OPENAI_API_KEY");
        if let Some(model) = var("MUSE_MODEL") {
            config.model = model;
        }
        if let Some(model) = var("MUSE_IMAGE_MODEL") {
            config.image_model = model;
        }
        if let Some(base) = var("MUSE_API_BASE") {
            config.api_base = base;
        }
        if let Some(path) = var("MUSE_STORAGE") {
            config.storage_path = PathBuf::from(path);
        }
        if let Some(t) = parse_var(&var, "MUSE_TEMPERATURE") {
            config.temperature = t;
        }
        if let Some(n) = parse_var(&var, "MUSE_MAX_TOKENS") {
            config.max_tokens = n;
        }
        if let Some(secs) = parse_var(&var, "MUSE_TIMEOUT_SECS") {
            config.timeout_secs = secs;
        }
        if let Some(window) = parse_var::<usize>(&var, "MUSE_HISTORY_WINDOW") {
            config.history_window = (window > 0).then_some(window);
        }
        config
    }

    /// Chat request for an assembled payload.
    pub fn chat_request(&self, messages: Vec<ChatMessage>) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    /// Image request for a composed scene prompt.
    pub fn image_request(&self, prompt: impl Into<String>) -> ImageRequest {
        ImageRequest::new(self.image_model.clone(), prompt)
    }
}

fn parse_var<T: std::str::FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = var(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {key}={raw:?}: not a valid number");
            None
        }
    }
}
