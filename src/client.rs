//! Core transport trait and error types.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::model::ChatRequest;

/// Raw response body as delivered by a transport, chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Bytes, ClientError>>;

/// Errors that can occur during client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("HTTP {status}: {message}")]
    Status {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("Invalid UTF-8 in response body: {0}")]
    Decode(#[from] std::str::Utf8Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Stream cancelled")]
    StreamCancelled,

    #[error("Transport failed after {attempts} attempts: {source}")]
    TransportExhausted {
        attempts: u32,
        #[source]
        source: Box<ClientError>,
    },

    #[error("Message is empty")]
    EmptyMessage,

    #[error("A stream is already active for this transcript")]
    StreamActive,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether a failed attempt may be retried by re-issuing the request.
    ///
    /// Transport failures, non-success statuses and undecodable bodies are
    /// retried. Cancellation and local misconfiguration are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Http(e) => !e.is_builder(),
            ClientError::Status { .. } | ClientError::Decode(_) => true,
            _ => false,
        }
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(e: toml::de::Error) -> Self {
        ClientError::Config(e.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Config(e.to_string())
    }
}

/// Connection seam used by the streaming client.
///
/// A transport opens one connection per call and hands back the response
/// body as a byte stream. It must report a non-success response as an error
/// rather than returning its body.
///
/// # Example
/// ```rust,ignore
/// struct Canned(Vec<&'static str>);
///
/// #[async_trait]
/// impl ChatTransport for Canned {
///     async fn open(&self, _request: &ChatRequest) -> Result<ByteStream, ClientError> {
///         let chunks = self.0.iter().map(|c| Ok(Bytes::from_static(c.as_bytes())));
///         Ok(futures::stream::iter(chunks.collect::<Vec<_>>()).boxed())
///     }
/// }
/// ```
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Issue the request and return the response body once headers arrive.
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream, ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let status = ClientError::Status {
            status: reqwest::StatusCode::BAD_GATEWAY,
            message: "upstream".to_string(),
        };
        assert!(status.is_retryable());

        let bad = std::str::from_utf8(&[0xff, 0xfe]).unwrap_err();
        assert!(ClientError::Decode(bad).is_retryable());

        assert!(!ClientError::StreamCancelled.is_retryable());
        assert!(!ClientError::Config("missing endpoint".to_string()).is_retryable());
        assert!(!ClientError::EmptyMessage.is_retryable());
    }

    #[test]
    fn test_exhausted_display_includes_cause() {
        let err = ClientError::TransportExhausted {
            attempts: 4,
            source: Box::new(ClientError::Api("boom".to_string())),
        };
        assert_eq!(
            err.to_string(),
            "Transport failed after 4 attempts: API error: boom"
        );
    }
}
