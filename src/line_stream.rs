//! Stream adapter that turns a byte stream into text lines.
//!
//! Both backends speak a line-oriented event protocol over a long-lived HTTP
//! response body. Chunks arrive at arbitrary boundaries, so incomplete lines
//! are buffered until their terminating newline shows up.

use crate::Error;
use futures_util::{Stream, StreamExt};
use memchr::memchr;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

/// Maximum bytes buffered while waiting for a newline.
const MAX_LINE_BUFFER: usize = 1_000_000;

/// A stream adapter that yields one text line per item.
pub struct LineStream<S> {
    inner: S,
    /// Incomplete raw bytes from previous chunks.
    buffer: Vec<u8>,
    /// Complete lines ready to be yielded.
    lines: VecDeque<String>,
    done: bool,
}

impl<S> LineStream<S> {
    /// Wrap a byte stream.
    pub fn new(stream: S) -> Self {
        Self {
            inner: stream,
            buffer: Vec::new(),
            lines: VecDeque::new(),
            done: false,
        }
    }

    /// Split complete lines out of the buffer.
    fn drain_buffer(&mut self) -> Result<(), Error> {
        let mut start = 0;
        while let Some(pos) = memchr(b'\n', &self.buffer[start..]) {
            let line_end = start + pos;
            let mut line_bytes = &self.buffer[start..line_end];
            if line_bytes.ends_with(b"\r") {
                line_bytes = &line_bytes[..line_bytes.len() - 1];
            }

            let line = std::str::from_utf8(line_bytes)
                .map_err(|e| Error::invalid_data(format!("invalid UTF-8 in stream line: {e}")))?
                .to_string();
            self.lines.push_back(line);
            start = line_end + 1;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }
        Ok(())
    }

    /// Flush whatever remains in the buffer as a final line.
    fn flush_remainder(&mut self) -> Option<Result<String, Error>> {
        if self.buffer.is_empty() {
            return None;
        }
        let remainder = std::mem::take(&mut self.buffer);
        match std::str::from_utf8(&remainder) {
            Ok(text) if !text.trim().is_empty() => Some(Ok(text.trim_end_matches('\r').to_string())),
            Ok(_) => None,
            Err(e) => Some(Err(Error::invalid_data(format!(
                "invalid UTF-8 at end of stream: {e}"
            )))),
        }
    }
}

impl<S, E> Stream for LineStream<S>
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Unpin,
    E: Into<Error>,
{
    type Item = Result<String, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(line) = self.lines.pop_front() {
                return Poll::Ready(Some(Ok(line)));
            }
            if self.done {
                return Poll::Ready(None);
            }

            let chunk = match ready!(self.inner.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => return Poll::Ready(Some(Err(e.into()))),
                None => {
                    // The body ended; a final line may lack its newline.
                    self.done = true;
                    return Poll::Ready(self.flush_remainder());
                }
            };

            self.buffer.extend_from_slice(&chunk);
            if self.buffer.len() > MAX_LINE_BUFFER {
                self.buffer.clear();
                return Poll::Ready(Some(Err(Error::invalid_data(
                    "stream line exceeded maximum buffered size",
                ))));
            }

            if let Err(e) = self.drain_buffer() {
                return Poll::Ready(Some(Err(e)));
            }
        }
    }
}

/// Extension trait to add line splitting to byte streams.
pub trait LineStreamExt: Stream {
    /// Interpret this byte stream as newline-delimited text.
    fn lines(self) -> LineStream<Self>
    where
        Self: Sized,
    {
        LineStream::new(self)
    }
}

impl<S: Stream> LineStreamExt for S {}
