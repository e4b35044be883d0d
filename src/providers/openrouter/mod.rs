//! Adapter for the OpenRouter cloud chat-completion backend.

pub mod types;

use crate::http::HttpClient;
use crate::provider::{spawn_stream, BackendKind, TextBackend};
use crate::response::{ResponseStream, UnifiedResponse};
use crate::session::{DecodedEvent, EventDecoder};
use crate::{Error, GenerationConfig};
use reqwest::Method;
use serde_json::value::RawValue;
use std::time::Duration;
use types::{ChatCompletionRequest, ChatCompletionResponse, KeyEnvelope, ModelInfo, ModelList, StreamChunk};

const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the OpenRouter API.
pub struct OpenRouterApi {
    http: HttpClient,
}

impl OpenRouterApi {
    /// Create a client against the public OpenRouter endpoint.
    pub fn new(api_key: Option<String>) -> Result<Self, Error> {
        Self::with_base_url(api_key, OPENROUTER_BASE_URL)
    }

    /// Create a client against a custom endpoint (used by tests).
    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Result<Self, Error> {
        Ok(Self {
            http: HttpClient::new(base_url, api_key, DEFAULT_TIMEOUT)?,
        })
    }

    /// Override the application identity headers.
    pub fn with_identity(mut self, title: impl Into<String>, referer: impl Into<String>) -> Self {
        self.http = self.http.with_identity(title, referer);
        self
    }

    /// Override the request timeout (default 60 seconds). For streamed
    /// requests it bounds connecting and the response head, not the body.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, Error> {
        self.http = self.http.with_timeout(timeout)?;
        Ok(self)
    }

    /// Probe the configured key; returns its human-readable label.
    pub async fn check_key(&self) -> Result<String, Error> {
        let envelope: KeyEnvelope = self.http.get_json("/key").await?;
        match envelope.data {
            Some(info) => Ok(info.label),
            None => Err(Error::InvalidResponse),
        }
    }

    /// List the models the service currently offers.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, Error> {
        let list: ModelList = self.http.get_json("/models").await?;
        Ok(list.data)
    }

    fn render(config: &GenerationConfig, stream: bool) -> Result<String, Error> {
        let request = ChatCompletionRequest::from_config(config, stream);
        Ok(serde_json::to_string(&request)?)
    }
}

#[async_trait::async_trait]
impl TextBackend for OpenRouterApi {
    fn kind(&self) -> BackendKind {
        BackendKind::OpenRouter
    }

    async fn send_once(&self, config: &GenerationConfig) -> Result<UnifiedResponse, Error> {
        let body = Self::render(config, false)?;
        let (response, raw): (ChatCompletionResponse, _) = self
            .http
            .request_json(Method::POST, "/chat/completions", Some(body))
            .await?;

        let choice = response.choices.into_iter().next();
        let message = choice.and_then(|c| c.message);
        let (role, text) = match message {
            Some(message) => (message.role, message.content),
            None => (None, None),
        };
        let usage = response.usage;

        Ok(UnifiedResponse::complete(
            role,
            text,
            usage.as_ref().and_then(|u| u.completion_tokens),
            usage.as_ref().and_then(|u| u.prompt_tokens),
            Some(raw),
        ))
    }

    fn stream(&self, config: &GenerationConfig) -> ResponseStream {
        let body = Self::render(config, true);
        spawn_stream(
            self.http.clone(),
            "/chat/completions".to_string(),
            body,
            OpenRouterDecoder,
        )
    }
}

/// Line decoder for the OpenRouter event grammar: JSON chunks with
/// `choices[0].delta`, terminated by the literal `[DONE]` sentinel.
pub(crate) struct OpenRouterDecoder;

impl EventDecoder for OpenRouterDecoder {
    fn decode(&self, payload: &str) -> DecodedEvent {
        if payload == "[DONE]" {
            return DecodedEvent::Finish {
                trailing_text: None,
            };
        }

        let Ok(chunk) = serde_json::from_str::<StreamChunk>(payload) else {
            return DecodedEvent::Ignore;
        };
        let delta = chunk.choices.into_iter().next().and_then(|c| c.delta);
        let (role, text) = match delta {
            Some(delta) => (delta.role, delta.content.unwrap_or_default()),
            None => (None, String::new()),
        };

        DecodedEvent::Delta {
            role,
            text,
            raw: RawValue::from_string(payload.to_string()).ok(),
        }
    }
}
