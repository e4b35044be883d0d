//! The backend adapter interface and the shared streaming pump.

use crate::http::HttpClient;
use crate::line_stream::LineStreamExt;
use crate::response::{ResponseStream, UnifiedResponse};
use crate::session::{EventDecoder, Ingest, StreamSession};
use crate::{Error, GenerationConfig};
use futures_util::StreamExt;
use std::fmt;
use tokio::sync::mpsc;
use tracing::debug;

/// How many fragments may sit unconsumed before the reader loop pauses.
const STREAM_CHANNEL_CAPACITY: usize = 16;

/// The two supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    OpenRouter,
    Kobold,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::OpenRouter => write!(f, "openrouter"),
            BackendKind::Kobold => write!(f, "kobold"),
        }
    }
}

/// A backend adapter: renders a [`GenerationConfig`] into its wire format and
/// reduces the backend's responses into [`UnifiedResponse`] values.
#[async_trait::async_trait]
pub trait TextBackend: Send + Sync + 'static {
    fn kind(&self) -> BackendKind;

    /// Send a single request and reduce the full response body.
    async fn send_once(&self, config: &GenerationConfig) -> Result<UnifiedResponse, Error>;

    /// Open a streamed request, yielding intermediate fragments and exactly
    /// one terminal value (or a terminal error).
    fn stream(&self, config: &GenerationConfig) -> ResponseStream;
}

/// Spawn the producer task for one streamed request.
///
/// The task exclusively owns the connection and the session's accumulation
/// buffer; consumers only ever see immutable snapshots. A failed channel send
/// means the consumer dropped the stream, which cancels the request.
pub(crate) fn spawn_stream<D>(
    http: HttpClient,
    path: String,
    body: Result<String, Error>,
    decoder: D,
) -> ResponseStream
where
    D: EventDecoder + 'static,
{
    let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let body = match body {
            Ok(body) => body,
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                return;
            }
        };

        let mut session = StreamSession::new(decoder);
        session.connecting();

        let response = match http.open_stream(&path, body).await {
            Ok(response) => response,
            Err(e) => {
                session.disconnected();
                let _ = tx.send(Err(e)).await;
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            session.disconnected();
            let _ = tx.send(Err(Error::server(status.as_u16()))).await;
            return;
        }
        session.connected();

        let mut lines = response.bytes_stream().lines();
        while let Some(item) = lines.next().await {
            let line = match item {
                Ok(line) => line,
                Err(e) => {
                    session.disconnected();
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            };

            match session.handle_line(&line) {
                Ingest::Skip => {}
                Ingest::Fragment(fragment) => {
                    if tx.send(Ok(fragment)).await.is_err() {
                        // Consumer is gone; stop reading and drop the connection.
                        return;
                    }
                }
                Ingest::Final(terminal) => {
                    let _ = tx.send(Ok(terminal)).await;
                    if session.skipped_lines() > 0 {
                        debug!(
                            skipped = session.skipped_lines(),
                            "stream contained unparseable data lines"
                        );
                    }
                    return;
                }
            }
        }

        // The body ended before any termination signal.
        if let Some(terminal) = session.end_of_stream() {
            let _ = tx.send(Ok(terminal)).await;
        }
    });

    ResponseStream::new(rx)
}
