//! Streaming session state machine.
//!
//! One session exists per streamed request. It owns the single accumulation
//! buffer and drives backend-specific line decoding through [`EventDecoder`];
//! decoders are stateless and never accumulate between calls.

use crate::response::UnifiedResponse;
use serde_json::value::RawValue;
use tracing::trace;

/// Lifecycle of a streamed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Reading,
    /// The backend signalled completion and the terminal fragment was emitted.
    Terminated,
    /// The connection ended abnormally (error, timeout, or truncated stream).
    Disconnected,
}

/// One decoded line of a backend's event stream.
pub(crate) enum DecodedEvent {
    /// A content delta.
    Delta {
        role: Option<String>,
        text: String,
        raw: Option<Box<RawValue>>,
    },
    /// A termination signal; `trailing_text` is content carried by the same
    /// event, appended before the terminal fragment is built.
    Finish { trailing_text: Option<String> },
    /// The payload did not match any known event shape.
    Ignore,
}

/// Backend-specific interpretation of one event payload (the part of a
/// `data:` line after the prefix).
pub(crate) trait EventDecoder: Send + Sync {
    fn decode(&self, payload: &str) -> DecodedEvent;
}

/// Outcome of feeding one line to the session.
pub(crate) enum Ingest {
    /// Nothing to emit (keep-alive, empty delta, or unparseable line).
    Skip,
    /// An intermediate fragment carrying the accumulation so far.
    Fragment(UnifiedResponse),
    /// The terminal fragment; the session is closed afterwards.
    Final(UnifiedResponse),
}

pub(crate) struct StreamSession<D> {
    decoder: D,
    state: SessionState,
    accumulated: String,
    skipped_lines: u64,
}

impl<D: EventDecoder> StreamSession<D> {
    pub fn new(decoder: D) -> Self {
        Self {
            decoder,
            state: SessionState::Idle,
            accumulated: String::new(),
            skipped_lines: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Lines that carried a `data:` marker but failed to decode.
    pub fn skipped_lines(&self) -> u64 {
        self.skipped_lines
    }

    pub fn connecting(&mut self) {
        self.state = SessionState::Connecting;
    }

    /// A 2xx response arrived; data events may now be read.
    pub fn connected(&mut self) {
        self.state = SessionState::Reading;
    }

    pub fn disconnected(&mut self) {
        self.state = SessionState::Disconnected;
    }

    /// Feed one raw line from the connection.
    pub fn handle_line(&mut self, line: &str) -> Ingest {
        // Anything not marked as a data event is protocol noise.
        let Some(payload) = line.strip_prefix("data:") else {
            return Ingest::Skip;
        };
        let payload = payload.trim();

        match self.decoder.decode(payload) {
            DecodedEvent::Delta { role, text, raw } => {
                if text.is_empty() {
                    return Ingest::Skip;
                }
                self.accumulated.push_str(&text);
                Ingest::Fragment(UnifiedResponse::fragment(
                    role,
                    self.accumulated.clone(),
                    raw,
                ))
            }
            DecodedEvent::Finish { trailing_text } => {
                if let Some(text) = trailing_text {
                    self.accumulated.push_str(&text);
                }
                self.state = SessionState::Terminated;
                Ingest::Final(UnifiedResponse::terminal(self.accumulated.clone(), false))
            }
            DecodedEvent::Ignore => {
                // Deliberately tolerant: treated as a keep-alive, but counted
                // so protocol drift stays observable.
                self.skipped_lines += 1;
                trace!(payload, "skipping unparseable stream line");
                Ingest::Skip
            }
        }
    }

    /// The connection ended without a termination signal.
    ///
    /// Returns the abnormal terminal fragment to emit, or `None` when the
    /// session already terminated cleanly.
    pub fn end_of_stream(&mut self) -> Option<UnifiedResponse> {
        match self.state {
            SessionState::Terminated | SessionState::Disconnected => None,
            _ => {
                self.state = SessionState::Disconnected;
                Some(UnifiedResponse::terminal(self.accumulated.clone(), true))
            }
        }
    }
}
