//! Adapter for a locally hosted KoboldCPP generation server.

pub mod types;

use crate::http::HttpClient;
use crate::provider::{spawn_stream, BackendKind, TextBackend};
use crate::response::{ResponseStream, UnifiedResponse};
use crate::session::{DecodedEvent, EventDecoder};
use crate::{Error, GenerationConfig};
use reqwest::Method;
use serde_json::value::RawValue;
use std::time::Duration;
use types::{
    GenerateRequest, GenerateResponse, ResultEnvelope, StreamChunk, TokenCountRequest,
    ValueEnvelope,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for a KoboldCPP server.
pub struct KoboldApi {
    http: HttpClient,
}

impl KoboldApi {
    /// Create a client for a server at `http://{host}:{port}`.
    pub fn new(host: &str, port: u16) -> Result<Self, Error> {
        Self::with_base_url(format!("http://{host}:{port}"))
    }

    /// Create a client against a full base URL (used by tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, Error> {
        Ok(Self {
            http: HttpClient::new(base_url, None, DEFAULT_TIMEOUT)?,
        })
    }

    /// Override the request timeout (default 120 seconds). For streamed
    /// requests it bounds connecting and the response head, not the body.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, Error> {
        self.http = self.http.with_timeout(timeout)?;
        Ok(self)
    }

    /// Name of the model the server is currently serving.
    pub async fn model(&self) -> Result<String, Error> {
        let envelope: ResultEnvelope = self.http.get_json("/api/v1/model").await?;
        Ok(envelope.result)
    }

    /// Server version string.
    pub async fn version(&self) -> Result<String, Error> {
        let envelope: ResultEnvelope = self.http.get_json("/api/v1/info/version").await?;
        Ok(envelope.result)
    }

    /// Maximum context window configured on the server.
    pub async fn max_context_length(&self) -> Result<i64, Error> {
        let envelope: ValueEnvelope = self
            .http
            .get_json("/api/v1/config/max_context_length")
            .await?;
        Ok(envelope.value)
    }

    /// Maximum generation length configured on the server.
    pub async fn max_length(&self) -> Result<i64, Error> {
        let envelope: ValueEnvelope = self.http.get_json("/api/v1/config/max_length").await?;
        Ok(envelope.value)
    }

    /// Count tokens in `prompt` with the server's own tokenizer.
    pub async fn count_tokens(&self, prompt: &str) -> Result<i64, Error> {
        let body = serde_json::to_string(&TokenCountRequest {
            prompt: prompt.to_string(),
        })?;
        let (envelope, _): (ValueEnvelope, _) =
            self.http.post_json("/api/extra/tokencount", body).await?;
        Ok(envelope.value)
    }

    fn render(config: &GenerationConfig) -> Result<String, Error> {
        let request = GenerateRequest::from_config(config);
        Ok(serde_json::to_string(&request)?)
    }
}

#[async_trait::async_trait]
impl TextBackend for KoboldApi {
    fn kind(&self) -> BackendKind {
        BackendKind::Kobold
    }

    async fn send_once(&self, config: &GenerationConfig) -> Result<UnifiedResponse, Error> {
        let body = Self::render(config)?;
        let (response, raw): (GenerateResponse, _) = self
            .http
            .request_json(Method::POST, "/api/v1/generate", Some(body))
            .await?;

        let result = response.results.into_iter().next();
        let (text, completion_tokens, prompt_tokens) = match result {
            Some(result) => (result.text, result.completion_tokens, result.prompt_tokens),
            None => (None, None, None),
        };

        Ok(UnifiedResponse::complete(
            None,
            text,
            completion_tokens,
            prompt_tokens,
            Some(raw),
        ))
    }

    fn stream(&self, config: &GenerationConfig) -> ResponseStream {
        let body = Self::render(config);
        spawn_stream(
            self.http.clone(),
            "/api/extra/generate/stream".to_string(),
            body,
            KoboldDecoder,
        )
    }
}

/// Line decoder for the KoboldCPP event grammar: JSON chunks carrying a
/// `token`, with `finish_reason` of `stop` or `length` signalling completion
/// (the final chunk's token still counts).
pub(crate) struct KoboldDecoder;

impl EventDecoder for KoboldDecoder {
    fn decode(&self, payload: &str) -> DecodedEvent {
        let Ok(chunk) = serde_json::from_str::<StreamChunk>(payload) else {
            return DecodedEvent::Ignore;
        };

        let token = chunk.token.unwrap_or_default();
        match chunk.finish_reason.as_deref() {
            Some("stop") | Some("length") => DecodedEvent::Finish {
                trailing_text: (!token.is_empty()).then_some(token),
            },
            _ => DecodedEvent::Delta {
                role: None,
                text: token,
                raw: RawValue::from_string(payload.to_string()).ok(),
            },
        }
    }
}
