//! Shared HTTP transport used by both backend adapters.
//!
//! Responsible for attaching the common headers, mapping transport failures
//! into the crate error taxonomy, and checking status codes before any body
//! decoding happens.

use crate::Error;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;
use std::time::Duration;
use tracing::debug;

const DEFAULT_APP_TITLE: &str = "crossllm";
const DEFAULT_REFERER: &str = "https://github.com/your-repo/crossllm";

#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    app_title: String,
    referer: String,
}

impl HttpClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let client = Client::builder().connect_timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
            timeout,
            app_title: DEFAULT_APP_TITLE.to_string(),
            referer: DEFAULT_REFERER.to_string(),
        })
    }

    /// Override the application identity sent in `X-Title` / `HTTP-Referer`.
    pub fn with_identity(mut self, title: impl Into<String>, referer: impl Into<String>) -> Self {
        self.app_title = title.into();
        self.referer = referer.into();
        self
    }

    /// Replace the request timeout. Rebuilds the inner client so the
    /// connect timeout follows suit.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, Error> {
        self.client = Client::builder().connect_timeout(timeout).build()?;
        self.timeout = timeout;
        Ok(self)
    }

    fn builder(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .client
            .request(method, url)
            .header("Content-Type", "application/json")
            .header("X-Title", &self.app_title)
            .header("HTTP-Referer", &self.referer);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        request
    }

    /// One-shot request: status is checked before the body is decoded, so a
    /// non-2xx answer is always a server error, never a decode error.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<(T, Box<RawValue>), Error> {
        let mut request = self.builder(method, path).timeout(self.timeout);
        if let Some(body) = body {
            request = request.body(body);
        }

        debug!(path, "dispatching request");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::server(status.as_u16()));
        }

        let text = response.text().await?;
        let raw = RawValue::from_string(text).map_err(|_| Error::InvalidResponse)?;
        let decoded = serde_json::from_str(raw.get())?;
        Ok((decoded, raw))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.request_json(Method::GET, path, None)
            .await
            .map(|(decoded, _)| decoded)
    }

    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: String,
    ) -> Result<(T, Box<RawValue>), Error> {
        self.request_json(Method::POST, path, Some(body)).await
    }

    /// Open a long-lived POST whose body will be consumed line by line.
    ///
    /// The timeout covers connecting and waiting for the response head only;
    /// once data is flowing there is no overall deadline.
    pub async fn open_stream(&self, path: &str, body: String) -> Result<Response, Error> {
        let request = self.builder(Method::POST, path).body(body);
        debug!(path, "opening streamed request");
        match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(response) => Ok(response?),
            Err(_) => Err(Error::Timeout),
        }
    }
}
