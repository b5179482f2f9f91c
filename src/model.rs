//! Chat data models: messages, the wire request, stream events and the transcript.

use serde::{Deserialize, Serialize};

use crate::client::ClientError;

/// Notice appended to the transcript when a send fails.
pub const FAILURE_NOTICE: &str = "An error occurred. Please try again.";

/// Role of the message sender.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Optional routing hints forwarded to the backend untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoutingMetadata {
    /// Target agent identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    /// Model name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl RoutingMetadata {
    /// Set the target agent.
    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// JSON body posted to the chat endpoint: `{ message, agentId?, model? }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,

    #[serde(flatten)]
    pub routing: RoutingMetadata,
}

impl ChatRequest {
    /// Build a request, rejecting empty or whitespace-only text.
    pub fn new(message: impl Into<String>, routing: RoutingMetadata) -> Result<Self, ClientError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        Ok(Self { message, routing })
    }
}

/// How a send ended. Exactly one is reported per send.
#[derive(Debug)]
pub enum Outcome {
    Completed,
    Cancelled,
    Failed(ClientError),
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    /// Convert into a `Result`, mapping cancellation to `ClientError::StreamCancelled`.
    pub fn into_result(self) -> Result<(), ClientError> {
        match self {
            Outcome::Completed => Ok(()),
            Outcome::Cancelled => Err(ClientError::StreamCancelled),
            Outcome::Failed(e) => Err(e),
        }
    }
}

/// Events produced by a streaming send, in delivery order.
#[derive(Debug)]
pub enum StreamEvent {
    /// First successful connection; open the assistant placeholder.
    Started,

    /// One frame payload to append to the in-progress message.
    Delta(String),

    /// An attempt failed and another one will follow after the retry delay.
    Retrying { attempt: u32, error: String },

    /// Clear content streamed so far before the retried attempt streams.
    Reset,

    /// Terminal event; nothing follows it.
    Finished(Outcome),
}

/// Insertion-ordered chat transcript with at most one message open for appending.
///
/// A failed send closes any partial assistant message and appends
/// [`FAILURE_NOTICE`] after it. A cancelled send leaves the transcript as is.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    in_progress: bool,
    active: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Whether a send is currently driving this transcript.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The assistant message currently receiving deltas, if any.
    pub fn in_progress(&self) -> Option<&Message> {
        if self.in_progress {
            self.messages.last()
        } else {
            None
        }
    }

    /// Append a user message and mark the transcript active.
    pub fn push_user(&mut self, text: &str) -> Result<(), ClientError> {
        if self.active {
            return Err(ClientError::StreamActive);
        }
        if text.trim().is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        self.messages.push(Message::user(text));
        self.active = true;
        Ok(())
    }

    /// Apply one stream event.
    pub fn apply(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::Started => {
                if !self.in_progress {
                    self.messages.push(Message::assistant(String::new()));
                    self.in_progress = true;
                }
            }
            StreamEvent::Delta(payload) => {
                if let Some(message) = self.open_message() {
                    message.content.push_str(payload);
                }
            }
            StreamEvent::Reset => {
                if let Some(message) = self.open_message() {
                    message.content.clear();
                }
            }
            StreamEvent::Retrying { .. } => {}
            StreamEvent::Finished(outcome) => {
                self.in_progress = false;
                if matches!(outcome, Outcome::Failed(_)) {
                    self.messages.push(Message::assistant(FAILURE_NOTICE));
                }
                self.active = false;
            }
        }
    }

    fn open_message(&mut self) -> Option<&mut Message> {
        if self.in_progress {
            self.messages.last_mut()
        } else {
            None
        }
    }
}
