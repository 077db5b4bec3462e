//! OpenAI-compatible streaming generation provider.
//!
//! Sends chat completion requests to any OpenAI-compatible endpoint
//! (OpenAI, Mistral, local inference servers) and streams the response
//! over SSE. The stream ends at the `[DONE]` sentinel; with
//! `include_usage` set, the chunk before it carries token usage.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is only exposed
//! when building the authorization header.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest_eventsource::{Event, RequestBuilderExt};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use mnemo_core::recall::{DeltaStream, GenerationProvider};
use mnemo_types::error::GenerationError;
use mnemo_types::generation::GenerationRequest;

use super::types::{ChatChunk, ChatMessage, ChatRequest, StreamOptions};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const SSE_DONE: &str = "[DONE]";

/// Streaming provider for any OpenAI-compatible chat completions API.
///
/// Does NOT derive Debug so the API key can never leak through debug
/// formatting of the provider.
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    provider_name: String,
}

impl OpenAiCompatProvider {
    pub fn new(
        provider_name: impl Into<String>,
        api_key: SecretString,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| GenerationError::Provider {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into(),
            model: model.into(),
            provider_name: provider_name.into(),
        })
    }

    /// Provider against the hosted OpenAI API.
    pub fn openai(api_key: SecretString, model: impl Into<String>) -> Result<Self, GenerationError> {
        Self::new("openai", api_key, DEFAULT_BASE_URL, model)
    }

    /// Override the base URL (testing, proxies, local servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn build_body(&self, request: &GenerationRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            stream: true,
            stream_options: StreamOptions {
                include_usage: true,
            },
        }
    }
}

impl GenerationProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn generate(&self, request: GenerationRequest) -> DeltaStream {
        let body = self.build_body(&request);
        let url = self.url();
        let client = self.client.clone();
        let api_key = self.api_key.clone();
        let model = self.model.clone();

        Box::pin(async_stream::try_stream! {
            let builder = client
                .post(&url)
                .header("authorization", format!("Bearer {}", api_key.expose_secret()))
                .header("content-type", "application/json")
                .json(&body);

            let mut source = builder.eventsource().map_err(|e| GenerationError::Provider {
                message: format!("failed to open event stream: {e}"),
            })?;

            debug!(%model, "generation stream opened");

            while let Some(event) = source.next().await {
                match event {
                    Ok(Event::Open) => {}
                    Ok(Event::Message(message)) => {
                        if message.data.trim() == SSE_DONE {
                            source.close();
                            break;
                        }
                        let chunk: ChatChunk =
                            serde_json::from_str(&message.data).map_err(|e| {
                                GenerationError::Deserialization(format!(
                                    "failed to parse stream chunk: {e}"
                                ))
                            })?;
                        if let Some(delta) = chunk.into_delta() {
                            yield delta;
                        }
                    }
                    Err(reqwest_eventsource::Error::StreamEnded) => break,
                    Err(e) => {
                        source.close();
                        Err(map_stream_error(e))?;
                    }
                }
            }
        })
    }
}

fn map_stream_error(err: reqwest_eventsource::Error) -> GenerationError {
    match &err {
        reqwest_eventsource::Error::InvalidStatusCode(status, _) => match status.as_u16() {
            401 => GenerationError::AuthenticationFailed,
            429 => GenerationError::RateLimited {
                retry_after_ms: None,
            },
            _ => GenerationError::Provider {
                message: format!("HTTP {status}"),
            },
        },
        reqwest_eventsource::Error::Transport(reqwest_err) => {
            match reqwest_err.status().map(|s| s.as_u16()) {
                Some(401) => GenerationError::AuthenticationFailed,
                Some(429) => GenerationError::RateLimited {
                    retry_after_ms: None,
                },
                _ => GenerationError::Provider {
                    message: format!("HTTP transport failed: {err}"),
                },
            }
        }
        _ => GenerationError::Stream(err.to_string()),
    }
}
