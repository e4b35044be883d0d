//! Unified response values and the consumer-pulled stream handle.

use crate::Error;
use futures_util::Stream;
use serde_json::value::RawValue;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// A backend-agnostic generation response.
///
/// For streamed requests this is one fragment: `text` holds the full
/// accumulation-to-date (never a diff) and `streaming` is true for every
/// fragment except the terminal one. Token counts are only available on
/// non-streamed responses and terminal fragments.
#[derive(Debug, Clone)]
pub struct UnifiedResponse {
    pub role: String,
    pub text: Option<String>,
    pub completion_tokens: Option<u32>,
    pub prompt_tokens: Option<u32>,
    pub streaming: bool,
    /// True only when the session ended abnormally (connection dropped
    /// before the backend signalled completion).
    pub disconnect: bool,
    /// The original provider payload, for consumers that need fields the
    /// unified shape does not carry.
    pub raw: Option<Box<RawValue>>,
}

impl UnifiedResponse {
    /// An intermediate streaming fragment carrying the accumulation so far.
    pub(crate) fn fragment(role: Option<String>, text: String, raw: Option<Box<RawValue>>) -> Self {
        Self {
            role: role.unwrap_or_else(|| "assistant".to_string()),
            text: Some(text),
            completion_tokens: None,
            prompt_tokens: None,
            streaming: true,
            disconnect: false,
            raw,
        }
    }

    /// The terminal value of a streamed request.
    pub(crate) fn terminal(text: String, disconnect: bool) -> Self {
        Self {
            role: "assistant".to_string(),
            text: Some(text),
            completion_tokens: None,
            prompt_tokens: None,
            streaming: false,
            disconnect,
            raw: None,
        }
    }

    /// A complete one-shot response.
    pub(crate) fn complete(
        role: Option<String>,
        text: Option<String>,
        completion_tokens: Option<u32>,
        prompt_tokens: Option<u32>,
        raw: Option<Box<RawValue>>,
    ) -> Self {
        Self {
            role: role.unwrap_or_else(|| "assistant".to_string()),
            text,
            completion_tokens,
            prompt_tokens,
            streaming: false,
            disconnect: false,
            raw,
        }
    }

    /// Decode the original provider payload into a concrete type.
    pub fn raw_as<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        self.raw
            .as_ref()
            .and_then(|raw| serde_json::from_str(raw.get()).ok())
    }
}

/// A lazily-pulled sequence of streamed response fragments.
///
/// Backed by a bounded channel: the producer task pauses when the consumer
/// falls behind, and dropping this handle closes the channel, which stops the
/// producer and releases the underlying connection.
pub struct ResponseStream {
    receiver: mpsc::Receiver<Result<UnifiedResponse, Error>>,
}

impl ResponseStream {
    pub(crate) fn new(receiver: mpsc::Receiver<Result<UnifiedResponse, Error>>) -> Self {
        Self { receiver }
    }

    /// Receive the next fragment, or `None` once the stream is closed.
    pub async fn next(&mut self) -> Option<Result<UnifiedResponse, Error>> {
        self.receiver.recv().await
    }

    /// Drain the stream and return the terminal response's text.
    ///
    /// Returns the first error encountered, if any.
    pub async fn final_text(mut self) -> Result<String, Error> {
        let mut last_text = String::new();
        while let Some(item) = self.next().await {
            let fragment = item?;
            if let Some(text) = fragment.text {
                last_text = text;
            }
            if !fragment.streaming {
                break;
            }
        }
        Ok(last_text)
    }
}

impl Stream for ResponseStream {
    type Item = Result<UnifiedResponse, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_final_text_stops_at_terminal() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(Ok(UnifiedResponse::fragment(None, "Hel".to_string(), None)))
            .await
            .unwrap();
        tx.send(Ok(UnifiedResponse::terminal("Hello".to_string(), false)))
            .await
            .unwrap();
        drop(tx);

        let stream = ResponseStream::new(rx);
        assert_eq!(stream.final_text().await.unwrap(), "Hello");
    }

    #[tokio::test]
    async fn test_final_text_surfaces_error() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(Err(Error::server(500))).await.unwrap();
        drop(tx);

        let stream = ResponseStream::new(rx);
        assert!(matches!(
            stream.final_text().await,
            Err(Error::Server { code: 500 })
        ));
    }

    #[test]
    fn test_raw_payload_round_trip() {
        let raw = serde_json::value::RawValue::from_string("{\"token\":\"hi\"}".to_string()).ok();
        let response = UnifiedResponse::fragment(None, "hi".to_string(), raw);
        let value: serde_json::Value = response.raw_as().unwrap();
        assert_eq!(value["token"], "hi");
    }
}
