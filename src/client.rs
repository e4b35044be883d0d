//! Service facade: one client bound to one backend at construction.

use crate::provider::{BackendKind, TextBackend};
use crate::providers::openrouter::types::ModelInfo;
use crate::providers::{KoboldApi, OpenRouterApi};
use crate::response::{ResponseStream, UnifiedResponse};
use crate::{Error, GenerationConfig};
use std::env;

/// The closed set of backends a client can be bound to.
pub enum Backend {
    OpenRouter(OpenRouterApi),
    Kobold(KoboldApi),
}

/// Configuration for constructing a [`Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub backend: BackendKind,
    pub api_key: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl ClientConfig {
    /// Configuration for the OpenRouter backend.
    pub fn open_router(api_key: Option<String>) -> Self {
        Self {
            backend: BackendKind::OpenRouter,
            api_key,
            host: None,
            port: None,
        }
    }

    /// Configuration for a local KoboldCPP server.
    pub fn kobold(host: impl Into<String>, port: u16) -> Self {
        Self {
            backend: BackendKind::Kobold,
            api_key: None,
            host: Some(host.into()),
            port: Some(port),
        }
    }

    /// Read configuration from environment variables.
    ///
    /// `CROSSLLM_BACKEND` selects `openrouter` (default) or `kobold`;
    /// `OPENROUTER_API_KEY`, `KOBOLD_HOST` and `KOBOLD_PORT` fill in the rest.
    pub fn from_env() -> Result<Self, Error> {
        let backend = env::var("CROSSLLM_BACKEND").unwrap_or_else(|_| "openrouter".to_string());
        match backend.to_lowercase().as_str() {
            "openrouter" => Ok(Self::open_router(env::var("OPENROUTER_API_KEY").ok())),
            "kobold" => {
                let host = env::var("KOBOLD_HOST").unwrap_or_else(|_| "localhost".to_string());
                let port = match env::var("KOBOLD_PORT") {
                    Ok(raw) => raw.parse().map_err(|_| {
                        Error::invalid_data(format!("invalid KOBOLD_PORT value `{raw}`"))
                    })?,
                    Err(_) => 5001,
                };
                Ok(Self::kobold(host, port))
            }
            other => Err(Error::invalid_data(format!(
                "invalid CROSSLLM_BACKEND `{other}`; expected openrouter or kobold"
            ))),
        }
    }
}

/// Stateless dispatcher over one concrete backend.
///
/// Uniform operations (`connect`, `send_message`, `stream_message`) work
/// against either backend; backend-specific extensions return
/// [`Error::InvalidService`] when the client is bound to the other backend,
/// without issuing any network call.
pub struct Client {
    backend: Backend,
}

impl Client {
    /// Bind to the OpenRouter backend.
    pub fn open_router(api_key: Option<String>) -> Result<Self, Error> {
        Ok(Self::from_backend(Backend::OpenRouter(OpenRouterApi::new(
            api_key,
        )?)))
    }

    /// Bind to a KoboldCPP server.
    pub fn kobold(host: &str, port: u16) -> Result<Self, Error> {
        Ok(Self::from_backend(Backend::Kobold(KoboldApi::new(
            host, port,
        )?)))
    }

    /// Bind to an already-constructed backend.
    pub fn from_backend(backend: Backend) -> Self {
        Self { backend }
    }

    /// Construct from a [`ClientConfig`].
    pub fn from_config(config: &ClientConfig) -> Result<Self, Error> {
        match config.backend {
            BackendKind::OpenRouter => Self::open_router(config.api_key.clone()),
            BackendKind::Kobold => {
                let host = config.host.as_deref().unwrap_or("localhost");
                let port = config.port.unwrap_or(5001);
                Self::kobold(host, port)
            }
        }
    }

    /// Construct from environment variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_config(&ClientConfig::from_env()?)
    }

    /// Which backend this client is bound to.
    pub fn kind(&self) -> BackendKind {
        match &self.backend {
            Backend::OpenRouter(api) => api.kind(),
            Backend::Kobold(api) => api.kind(),
        }
    }

    /// Identity probe: the key label for OpenRouter, the served model name
    /// for Kobold.
    pub async fn connect(&self) -> Result<String, Error> {
        match &self.backend {
            Backend::OpenRouter(api) => api.check_key().await,
            Backend::Kobold(api) => api.model().await,
        }
    }

    /// Send a one-shot generation request.
    pub async fn send_message(&self, config: &GenerationConfig) -> Result<UnifiedResponse, Error> {
        match &self.backend {
            Backend::OpenRouter(api) => api.send_once(config).await,
            Backend::Kobold(api) => api.send_once(config).await,
        }
    }

    /// Open a streamed generation request.
    pub fn stream_message(&self, config: &GenerationConfig) -> ResponseStream {
        match &self.backend {
            Backend::OpenRouter(api) => api.stream(config),
            Backend::Kobold(api) => api.stream(config),
        }
    }

    /// List available models (OpenRouter only).
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, Error> {
        match &self.backend {
            Backend::OpenRouter(api) => api.list_models().await,
            Backend::Kobold(_) => Err(Error::invalid_service("list_models", BackendKind::Kobold)),
        }
    }

    /// Count tokens with the server's tokenizer (Kobold only).
    pub async fn count_tokens(&self, prompt: &str) -> Result<i64, Error> {
        match &self.backend {
            Backend::Kobold(api) => api.count_tokens(prompt).await,
            Backend::OpenRouter(_) => Err(Error::invalid_service(
                "count_tokens",
                BackendKind::OpenRouter,
            )),
        }
    }

    /// Maximum context window configured on the server (Kobold only).
    pub async fn max_context_length(&self) -> Result<i64, Error> {
        match &self.backend {
            Backend::Kobold(api) => api.max_context_length().await,
            Backend::OpenRouter(_) => Err(Error::invalid_service(
                "max_context_length",
                BackendKind::OpenRouter,
            )),
        }
    }

    /// Maximum generation length configured on the server (Kobold only).
    pub async fn max_length(&self) -> Result<i64, Error> {
        match &self.backend {
            Backend::Kobold(api) => api.max_length().await,
            Backend::OpenRouter(_) => Err(Error::invalid_service(
                "max_length",
                BackendKind::OpenRouter,
            )),
        }
    }

    /// Server version string (Kobold only).
    pub async fn version(&self) -> Result<String, Error> {
        match &self.backend {
            Backend::Kobold(api) => api.version().await,
            Backend::OpenRouter(_) => {
                Err(Error::invalid_service("version", BackendKind::OpenRouter))
            }
        }
    }
}
