//! Incremental `data: ` frame extraction from a chunked response body.
//!
//! Stream format:
//! ```text
//! data: Hello
//! keepalive
//! data:  world
//! ```
//!
//! Chunk boundaries do not line up with line boundaries, or even with UTF-8
//! character boundaries, so the decoder carries both an undecoded byte tail
//! and an unterminated line forward to the next chunk.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use tracing::debug;

use crate::client::ClientError;
use crate::options::TrailingFrame;

/// Sentinel marking a line as a frame.
pub const DATA_PREFIX: &str = "data: ";

/// Extract the payload of a frame line.
///
/// The payload is everything after the sentinel, verbatim.
///
/// # Example
/// ```
/// use chatstream::sse::parse_data_line;
///
/// assert_eq!(parse_data_line("data: hello"), Some("hello"));
/// assert_eq!(parse_data_line("data:  world"), Some(" world"));
/// assert_eq!(parse_data_line("keepalive"), None);
/// ```
pub fn parse_data_line(line: &str) -> Option<&str> {
    line.strip_prefix(DATA_PREFIX)
}

/// Stateful decoder turning byte chunks into frame payloads.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Bytes of an incomplete UTF-8 sequence at the end of the last chunk
    pending_bytes: Vec<u8>,
    partial_line: String,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text received after the last line terminator.
    pub fn partial_line(&self) -> &str {
        &self.partial_line
    }

    /// Feed one chunk and return the payloads of every line it completes.
    ///
    /// Invalid UTF-8 yields `ClientError::Decode` and clears the decoder.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, ClientError> {
        self.pending_bytes.extend_from_slice(chunk);

        let decoded_len = match std::str::from_utf8(&self.pending_bytes) {
            Ok(_) => self.pending_bytes.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => {
                self.reset();
                return Err(ClientError::Decode(e));
            }
        };

        let tail = self.pending_bytes.split_off(decoded_len);
        let bytes = std::mem::replace(&mut self.pending_bytes, tail);
        // Validated above.
        let text = std::str::from_utf8(&bytes)?;
        self.partial_line.push_str(text);

        let Some(last_newline) = self.partial_line.rfind('\n') else {
            return Ok(Vec::new());
        };

        let rest = self.partial_line.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.partial_line, rest);

        let frames = complete
            .split_terminator('\n')
            .filter_map(|line| parse_data_line(line.strip_suffix('\r').unwrap_or(line)))
            .map(str::to_owned)
            .collect();
        Ok(frames)
    }

    /// Handle end of stream, applying the trailing frame policy to any
    /// unterminated final line.
    ///
    /// A body ending inside a multi-byte character yields `ClientError::Decode`.
    pub fn finish(&mut self, policy: TrailingFrame) -> Result<Option<String>, ClientError> {
        let line = std::mem::take(&mut self.partial_line);
        let tail = std::mem::take(&mut self.pending_bytes);
        if !tail.is_empty() {
            std::str::from_utf8(&tail)?;
        }

        let Some(payload) = parse_data_line(line.strip_suffix('\r').unwrap_or(&line)) else {
            return Ok(None);
        };
        match policy {
            TrailingFrame::Flush => Ok(Some(payload.to_owned())),
            TrailingFrame::Discard => {
                debug!(len = payload.len(), "Discarding unterminated trailing frame");
                Ok(None)
            }
        }
    }

    /// Drop all buffered state.
    pub fn reset(&mut self) {
        self.pending_bytes.clear();
        self.partial_line.clear();
    }
}

/// Extension trait turning a raw body stream into a stream of frame payloads.
///
/// # Example
/// ```ignore
/// use chatstream::sse::FrameStreamExt;
///
/// let mut frames = body.frames(TrailingFrame::Discard);
/// while let Some(frame) = frames.next().await {
///     print!("{}", frame?);
/// }
/// ```
pub trait FrameStreamExt {
    /// Yields payloads in arrival order; ends when the body ends. The first
    /// error ends the stream after being yielded.
    fn frames(self, policy: TrailingFrame) -> BoxStream<'static, Result<String, ClientError>>;
}

impl<S> FrameStreamExt for S
where
    S: Stream<Item = Result<Bytes, ClientError>> + Send + 'static,
{
    fn frames(self, policy: TrailingFrame) -> BoxStream<'static, Result<String, ClientError>> {
        stream::unfold(
            (
                Box::pin(self),
                FrameDecoder::new(),
                VecDeque::<String>::new(),
                false,
            ),
            move |(mut body, mut decoder, mut ready, mut done)| async move {
                loop {
                    if let Some(frame) = ready.pop_front() {
                        return Some((Ok(frame), (body, decoder, ready, done)));
                    }
                    if done {
                        return None;
                    }

                    match body.next().await {
                        Some(Ok(chunk)) => match decoder.push(&chunk) {
                            Ok(frames) => ready.extend(frames),
                            Err(e) => {
                                done = true;
                                return Some((Err(e), (body, decoder, ready, done)));
                            }
                        },
                        Some(Err(e)) => {
                            done = true;
                            return Some((Err(e), (body, decoder, ready, done)));
                        }
                        None => {
                            done = true;
                            match decoder.finish(policy) {
                                Ok(frame) => ready.extend(frame),
                                Err(e) => return Some((Err(e), (body, decoder, ready, done))),
                            }
                        }
                    }
                }
            },
        )
        .boxed()
    }
}
