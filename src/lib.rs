//! # chatstream - Streaming chat client for coding-assistant backends
//!
//! Consumes a chat endpoint that answers a POST with a chunked body of
//! `data: <payload>` lines, and turns it into a live-updating assistant
//! message.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Incremental framing robust to arbitrary chunk boundaries
//! - Bounded retry with a fixed delay, shared across connect and mid-stream failures
//! - Cooperative cancellation via `CancellationToken`
//! - Exactly one terminal outcome per send: completed, cancelled or failed
//!
//! ## Architecture
//!
//! - **`ChatTransport`**: seam opening one connection and returning the raw body
//! - **`FrameDecoder`**: bytes to frame payloads, carrying partial lines forward
//! - **`StreamSession`**: lifecycle state and retry accounting for one send
//! - **`StreamingChatClient`**: drives the above and emits `StreamEvent`s
//! - **`Transcript`**: append-only message list the events are applied to
//!
//! ## Example
//! ```no_run
//! use chatstream::model::{RoutingMetadata, StreamEvent};
//! use chatstream::options::ClientOptions;
//! use chatstream::{ChatRequest, StreamingChatClient};
//! use futures::StreamExt;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = ClientOptions::new("http://localhost:5000/api/chat");
//!     let client = StreamingChatClient::from_options(&options)?;
//!
//!     let request = ChatRequest::new("Hello!", RoutingMetadata::default())?;
//!     let events = client.send(request, CancellationToken::new());
//!     futures::pin_mut!(events);
//!
//!     while let Some(event) = events.next().await {
//!         match event {
//!             StreamEvent::Delta(text) => print!("{}", text),
//!             StreamEvent::Finished(outcome) => outcome.into_result()?,
//!             _ => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod debounce;
pub mod envelope;
pub mod http;
pub mod model;
pub mod options;
pub mod session;
pub mod settings;
pub mod sse;
pub mod stream;
pub mod transport;

// Re-exports for convenience
pub use client::{ChatTransport, ClientError};
pub use model::{ChatRequest, Message, Outcome, StreamEvent, Transcript};
pub use stream::StreamingChatClient;
