//! HTTP model client.
//!
//! [`HttpModel`] speaks the Anthropic Messages API and the `OpenAI` Chat
//! Completions API. Transient failures (transport errors, 429 and 5xx) are
//! retried with exponential backoff; any other non-success status fails
//! immediately with the provider's error message.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{LanguageModel, ModelError, ModelSettings, Prompt, Provider};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Total attempts per call, the first one included.
const MAX_ATTEMPTS: u32 = 4;

/// Delay before the first retry; doubles on every further retry.
const BASE_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

/// Both providers wrap errors as `{"error": {"message": ...}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// A language model reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpModel {
    client: Client,
    settings: ModelSettings,
    api_key: String,
}

impl HttpModel {
    /// Builds a model from settings, reading the API key from the
    /// environment variable the settings name.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::MissingApiKey` if the variable is unset or blank.
    pub fn from_settings(settings: ModelSettings) -> Result<Self, ModelError> {
        let variable = settings.api_key_variable().to_string();
        let api_key = std::env::var(&variable)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ModelError::MissingApiKey {
                provider: settings.provider,
                variable,
            })?;
        Self::with_api_key(settings, api_key)
    }

    /// Builds a model with an explicit API key.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ClientBuild` if the HTTP client cannot be created.
    pub fn with_api_key(
        settings: ModelSettings,
        api_key: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| ModelError::ClientBuild(e.to_string()))?;
        Ok(Self {
            client,
            settings,
            api_key: api_key.into(),
        })
    }

    /// The settings this model was built from.
    #[must_use]
    pub const fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    fn endpoint(&self) -> String {
        match self.settings.provider {
            Provider::Anthropic => format!("{}/messages", self.settings.base_url()),
            Provider::OpenAi => format!("{}/chat/completions", self.settings.base_url()),
        }
    }

    fn request_body(&self, prompt: &Prompt) -> Result<serde_json::Value, ModelError> {
        let model = self.settings.model_id();
        let body = match self.settings.provider {
            Provider::Anthropic => serde_json::to_value(AnthropicRequest {
                model,
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
                system: &prompt.system,
                messages: vec![ChatMessage {
                    role: "user",
                    content: &prompt.user,
                }],
            })?,
            Provider::OpenAi => serde_json::to_value(OpenAiRequest {
                model,
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: &prompt.system,
                    },
                    ChatMessage {
                        role: "user",
                        content: &prompt.user,
                    },
                ],
            })?,
        };
        Ok(body)
    }

    async fn send(&self, body: &serde_json::Value) -> Result<reqwest::Response, reqwest::Error> {
        let request = self.client.post(self.endpoint()).json(body);
        let request = match self.settings.provider {
            Provider::Anthropic => request
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            Provider::OpenAi => request.bearer_auth(&self.api_key),
        };
        request.send().await
    }
}

#[async_trait]
impl LanguageModel for HttpModel {
    #[instrument(skip(self, prompt), fields(model = %self.settings.model_id()))]
    async fn generate(&self, prompt: &Prompt) -> Result<String, ModelError> {
        let body = self.request_body(prompt)?;
        let mut last_error: Option<ModelError> = None;

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let delay = Duration::from_millis(BASE_BACKOFF_MS << (attempt - 1));
                warn!(
                    attempt,
                    delay_ms = delay.as_millis(),
                    "Model call failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.send(&body).await {
                Ok(response) => response,
                Err(e) => {
                    last_error = Some(ModelError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            let text = response.text().await?;

            if status.as_u16() == 429 || status.is_server_error() {
                warn!(status = status.as_u16(), "Model API returned a transient error");
                last_error = Some(ModelError::Api {
                    status: status.as_u16(),
                    message: error_message(&text),
                });
                continue;
            }

            if !status.is_success() {
                return Err(ModelError::Api {
                    status: status.as_u16(),
                    message: error_message(&text),
                });
            }

            return parse_completion(self.settings.provider, &text);
        }

        Err(last_error.unwrap_or(ModelError::RetriesExhausted {
            attempts: MAX_ATTEMPTS,
        }))
    }

    fn describe(&self) -> String {
        self.settings.to_string()
    }
}

/// Extracts the provider's error message, falling back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string())
}

/// Pulls the generated text out of a successful response body.
fn parse_completion(provider: Provider, body: &str) -> Result<String, ModelError> {
    let text = match provider {
        Provider::Anthropic => {
            let response: AnthropicResponse = serde_json::from_str(body)?;
            if let Some(usage) = &response.usage {
                debug!(
                    input_tokens = usage.input_tokens,
                    output_tokens = usage.output_tokens,
                    "Model call succeeded"
                );
            }
            response
                .content
                .into_iter()
                .filter(|block| block.block_type == "text")
                .filter_map(|block| block.text)
                .collect::<Vec<_>>()
                .join("")
        }
        Provider::OpenAi => {
            let response: OpenAiResponse = serde_json::from_str(body)?;
            response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .unwrap_or_default()
        }
    };

    if text.trim().is_empty() {
        return Err(ModelError::EmptyContent);
    }
    Ok(text)
}
