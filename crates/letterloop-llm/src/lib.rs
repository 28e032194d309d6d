//! LetterLoop language model boundary.
//!
//! Every model call made by the draft/review loop goes through the
//! [`LanguageModel`] trait defined here. The loop never talks to a provider
//! directly: it receives `Arc<dyn LanguageModel>` handles built from
//! [`ModelSettings`], which keeps the main and translation models
//! independent and lets tests substitute scripted models.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod client;

pub use client::HttpModel;

/// Errors that can occur while building or invoking a language model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The API key environment variable is not set.
    #[error("missing API key for {provider}: set the {variable} environment variable")]
    MissingApiKey {
        /// Provider that needs the key.
        provider: Provider,
        /// Environment variable that was consulted.
        variable: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// Transport-level failure talking to the provider.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Error message extracted from the response body.
        message: String,
    },

    /// The provider response could not be decoded.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Transient failures persisted through every retry.
    #[error("model call failed after {attempts} attempts")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
    },

    /// The model returned no usable text.
    #[error("model returned empty content")]
    EmptyContent,
}

impl ModelError {
    /// Returns true if the error happened while constructing a model rather
    /// than while invoking one.
    #[must_use]
    pub const fn is_initialization(&self) -> bool {
        matches!(self, Self::MissingApiKey { .. } | Self::ClientBuild(_))
    }
}

/// Supported model providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Provider {
    /// Anthropic Messages API (default).
    #[default]
    Anthropic,
    /// `OpenAI` Chat Completions API, or any compatible server.
    OpenAi,
}

impl Provider {
    /// Parses a provider name case-insensitively.
    pub fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Some(Self::Anthropic),
            "openai" | "open_ai" | "gpt" => Some(Self::OpenAi),
            _ => None,
        }
    }

    /// Environment variable holding the API key when none is configured.
    #[must_use]
    pub const fn default_api_key_env(self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }

    /// Model used when the settings do not name one.
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::Anthropic => "claude-sonnet-4-5",
            Self::OpenAi => "gpt-4o",
        }
    }

    /// Base URL of the provider's public API.
    #[must_use]
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::OpenAi => "https://api.openai.com/v1",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anthropic => write!(f, "anthropic"),
            Self::OpenAi => write!(f, "openai"),
        }
    }
}

impl<'de> Deserialize<'de> for Provider {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_case_insensitive(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid model provider '{s}': expected one of 'anthropic', 'openai'"
            ))
        })
    }
}

impl Serialize for Provider {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

const fn default_temperature() -> f32 {
    0.7
}

const fn default_max_tokens() -> u32 {
    4096
}

const fn default_request_timeout() -> u64 {
    120
}

/// Settings for one model instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSettings {
    /// Which API to talk to.
    #[serde(default)]
    pub provider: Provider,

    /// Model identifier. Falls back to the provider default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on generated tokens.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Override for the provider base URL (e.g. a local compatible server).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Override for the environment variable holding the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            base_url: None,
            api_key_env: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ModelSettings {
    /// Creates settings for a provider with its default model.
    #[must_use]
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            ..Self::default()
        }
    }

    /// Replaces the model identifier.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Replaces the sampling temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// The effective model identifier.
    #[must_use]
    pub fn model_id(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// The effective API key environment variable.
    #[must_use]
    pub fn api_key_variable(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_key_env())
    }

    /// The effective base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
    }
}

impl std::fmt::Display for ModelSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} (temperature {})",
            self.provider,
            self.model_id(),
            self.temperature
        )
    }
}

/// A structured prompt: role instructions plus the task itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// System instructions describing the role.
    pub system: String,
    /// The rendered task for this call.
    pub user: String,
}

impl Prompt {
    /// Creates a new prompt.
    #[must_use]
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// A text-generating model.
///
/// Implementations must not share mutable state between instances: the
/// loop holds a main model and a translation model side by side.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Runs one completion and returns the raw text.
    async fn generate(&self, prompt: &Prompt) -> Result<String, ModelError>;

    /// Short human-readable description, used in logs and summaries.
    fn describe(&self) -> String;
}
