//! Streaming chat client with bounded retry and cooperative cancellation.

use std::sync::Arc;

use futures::stream::{self, BoxStream, Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

use crate::client::{ChatTransport, ClientError};
use crate::model::{ChatRequest, Outcome, RoutingMetadata, StreamEvent, Transcript};
use crate::options::{ClientOptions, RetryContent, StreamOptions};
use crate::session::{RetryDecision, SessionState, StreamSession};
use crate::sse::FrameStreamExt;
use crate::transport::HttpChatTransport;

/// Client turning a chunked chat response into a live assistant message.
///
/// Each [`send`](Self::send) is one logical request: it may open up to
/// `1 + max_retries` connections, and reports exactly one terminal
/// [`Outcome`]. The client does not serialize concurrent sends; drive one
/// send per transcript at a time (see [`Transcript::push_user`]).
///
/// # Example
/// ```no_run
/// use chatstream::model::{RoutingMetadata, Transcript};
/// use chatstream::options::ClientOptions;
/// use chatstream::StreamingChatClient;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn run() -> Result<(), chatstream::ClientError> {
/// let client = StreamingChatClient::from_options(&ClientOptions::new(
///     "http://localhost:5000/api/chat",
/// ))?;
///
/// let mut transcript = Transcript::new();
/// let outcome = client
///     .send_into(
///         &mut transcript,
///         "Explain this repository",
///         RoutingMetadata::default().with_model("gpt-4o"),
///         CancellationToken::new(),
///     )
///     .await;
/// outcome.into_result()?;
/// println!("{}", transcript.last().unwrap().content);
/// # Ok(())
/// # }
/// ```
pub struct StreamingChatClient<T = HttpChatTransport> {
    transport: Arc<T>,
    options: StreamOptions,
    parent_span: Option<Span>,
}

impl StreamingChatClient<HttpChatTransport> {
    /// Create a client posting to the configured HTTP endpoint.
    pub fn from_options(options: &ClientOptions) -> Result<Self, ClientError> {
        let transport = HttpChatTransport::new(options)?;
        Ok(Self::new(transport, options.stream.clone()))
    }
}

impl<T: ChatTransport + 'static> StreamingChatClient<T> {
    pub fn new(transport: T, options: StreamOptions) -> Self {
        Self {
            transport: Arc::new(transport),
            options,
            parent_span: None,
        }
    }

    /// Record every send under the given span instead of the caller's
    /// current one.
    pub fn with_span(mut self, span: Span) -> Self {
        self.parent_span = Some(span);
        self
    }

    pub fn options(&self) -> &StreamOptions {
        &self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Start a send and return its events.
    ///
    /// The stream yields `Started` once the first connection succeeds, one
    /// `Delta` per frame in body order, `Retrying`/`Reset` around retries, and
    /// ends right after a single `Finished`. Cancelling `cancel` aborts the
    /// in-flight connect, read or retry delay.
    pub fn send(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> impl Stream<Item = StreamEvent> + Send + 'static {
        let span = match &self.parent_span {
            Some(parent) => info_span!(
                parent: parent,
                "chat_send",
                agent_id = ?request.routing.agent_id,
                model = ?request.routing.model
            ),
            None => info_span!(
                "chat_send",
                agent_id = ?request.routing.agent_id,
                model = ?request.routing.model
            ),
        };

        let driver = SendDriver {
            transport: Arc::clone(&self.transport),
            session: StreamSession::new(self.options.max_retries),
            options: self.options.clone(),
            request,
            cancel,
            frames: stream::empty().boxed(),
            backoff: false,
            streamed: false,
            reset_pending: false,
        };

        stream::unfold((driver, span), |(mut driver, span)| async move {
            let event = driver.next_event().instrument(span.clone()).await?;
            Some((event, (driver, span)))
        })
    }

    /// Send `text` and apply the resulting events to `transcript`.
    ///
    /// Blank input and a transcript with an active send are rejected before
    /// any request is made.
    pub async fn send_into(
        &self,
        transcript: &mut Transcript,
        text: &str,
        routing: RoutingMetadata,
        cancel: CancellationToken,
    ) -> Outcome {
        let request = match ChatRequest::new(text, routing) {
            Ok(request) => request,
            Err(e) => return Outcome::Failed(e),
        };
        if let Err(e) = transcript.push_user(text) {
            return Outcome::Failed(e);
        }

        let events = self.send(request, cancel);
        futures::pin_mut!(events);

        let mut outcome = Outcome::Completed;
        while let Some(event) = events.next().await {
            transcript.apply(&event);
            if let StreamEvent::Finished(finished) = event {
                outcome = finished;
            }
        }
        outcome
    }
}

/// State of one in-flight send.
struct SendDriver<T> {
    transport: Arc<T>,
    session: StreamSession,
    options: StreamOptions,
    request: ChatRequest,
    cancel: CancellationToken,
    frames: BoxStream<'static, Result<String, ClientError>>,
    /// Wait the retry delay before the next connect
    backoff: bool,
    /// Content delivered since the placeholder was opened or last reset
    streamed: bool,
    reset_pending: bool,
}

impl<T: ChatTransport> SendDriver<T> {
    /// Advance until the next event. Returns `None` once the session ended.
    async fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            match self.session.state() {
                SessionState::Idle => {
                    info!(len = self.request.message.len(), "Sending chat message");
                    self.session.begin();
                }
                SessionState::Connecting => {
                    if let Some(event) = self.connect().await {
                        return Some(event);
                    }
                }
                SessionState::Streaming => {
                    if let Some(event) = self.read().await {
                        return Some(event);
                    }
                }
                SessionState::Completed | SessionState::Failed | SessionState::Cancelled => {
                    return None;
                }
            }
        }
    }

    async fn connect(&mut self) -> Option<StreamEvent> {
        if self.backoff {
            self.backoff = false;
            let delay = self.options.retry_delay();
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.cancelled(),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let opened = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return self.cancelled(),
            result = self.transport.open(&self.request) => result,
        };

        match opened {
            Ok(body) => {
                self.frames = body.frames(self.options.trailing_frame);
                let first = self.session.connected();
                debug!(attempt = self.session.attempts(), "Chat stream connected");

                if first {
                    Some(StreamEvent::Started)
                } else if self.reset_pending {
                    self.reset_pending = false;
                    self.streamed = false;
                    Some(StreamEvent::Reset)
                } else {
                    None
                }
            }
            Err(e) => self.attempt_failed(e),
        }
    }

    async fn read(&mut self) -> Option<StreamEvent> {
        let next = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return self.cancelled(),
            next = self.frames.next() => next,
        };

        match next {
            Some(Ok(frame)) => {
                self.streamed = true;
                Some(StreamEvent::Delta(frame))
            }
            Some(Err(e)) => self.attempt_failed(e),
            None => {
                self.session.complete();
                info!(attempts = self.session.attempts(), "Chat stream completed");
                Some(StreamEvent::Finished(Outcome::Completed))
            }
        }
    }

    fn attempt_failed(&mut self, e: ClientError) -> Option<StreamEvent> {
        self.frames = stream::empty().boxed();

        if !e.is_retryable() {
            self.session.fail();
            error!(error = %e, "Chat stream failed");
            return Some(StreamEvent::Finished(Outcome::Failed(e)));
        }

        match self.session.attempt_failed() {
            RetryDecision::Retry { attempt } => {
                warn!(
                    attempt,
                    max_retries = self.options.max_retries,
                    error = %e,
                    "Chat stream attempt failed, retrying"
                );
                self.backoff = true;
                if self.options.retry_content == RetryContent::Reset && self.streamed {
                    self.reset_pending = true;
                }
                Some(StreamEvent::Retrying {
                    attempt,
                    error: e.to_string(),
                })
            }
            RetryDecision::Exhausted => {
                let attempts = self.session.attempts();
                error!(attempts, error = %e, "Chat stream retries exhausted");
                Some(StreamEvent::Finished(Outcome::Failed(
                    ClientError::TransportExhausted {
                        attempts,
                        source: Box::new(e),
                    },
                )))
            }
            RetryDecision::Ignored => None,
        }
    }

    fn cancelled(&mut self) -> Option<StreamEvent> {
        if self.session.cancel() {
            info!(attempts = self.session.attempts(), "Chat stream cancelled");
            Some(StreamEvent::Finished(Outcome::Cancelled))
        } else {
            None
        }
    }
}
