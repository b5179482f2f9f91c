//! Stream one chat reply to stdout.
//!
//! Run with:
//! ```bash
//! export CHAT_ENDPOINT="http://localhost:5000/api/chat"
//! cargo run --example stream_chat -- "Summarize this project"
//! # or with a TOML config file
//! CHAT_CONFIG=chat.toml cargo run --example stream_chat -- "Hello"
//! ```
//! Press Ctrl-C to cancel the stream.

use std::io::Write;

use chatstream::model::{RoutingMetadata, StreamEvent};
use chatstream::options::ClientOptions;
use chatstream::{ChatRequest, Outcome, StreamingChatClient};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let options = match std::env::var("CHAT_CONFIG") {
        Ok(path) => ClientOptions::load(path)?,
        Err(_) => ClientOptions::new(
            std::env::var("CHAT_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:5000/api/chat".to_string()),
        ),
    };

    let message = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Hello!".to_string());
    let mut routing = RoutingMetadata::default();
    if let Ok(agent) = std::env::var("CHAT_AGENT_ID") {
        routing = routing.with_agent_id(agent);
    }
    if let Ok(model) = std::env::var("CHAT_MODEL") {
        routing = routing.with_model(model);
    }

    let client = StreamingChatClient::from_options(&options)?;
    let request = ChatRequest::new(message, routing)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let events = client.send(request, cancel);
    futures::pin_mut!(events);

    while let Some(event) = events.next().await {
        match event {
            StreamEvent::Started => print!("Assistant: "),
            StreamEvent::Delta(text) => {
                print!("{}", text);
                std::io::stdout().flush()?;
            }
            StreamEvent::Retrying { attempt, error } => {
                eprintln!("\n[retry {}: {}]", attempt, error);
            }
            StreamEvent::Reset => print!("\rAssistant: "),
            StreamEvent::Finished(Outcome::Completed) => println!(),
            StreamEvent::Finished(Outcome::Cancelled) => println!("\n[cancelled]"),
            StreamEvent::Finished(Outcome::Failed(e)) => {
                eprintln!("\nError: {}", e);
                return Err(e.into());
            }
        }
    }

    Ok(())
}
