//! Client configuration: endpoint, HTTP transport settings and stream policies.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::client::ClientError;

/// A secret string type for sensitive data like API keys.
/// Prevents accidental logging or display of secrets.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    /// Create a new secret string.
    pub fn new(s: String) -> Self {
        Self(s)
    }

    /// Get the underlying secret value.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

/// What to do with content already streamed when an attempt is retried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryContent {
    /// Keep appending to the same message.
    #[default]
    Append,
    /// Clear the message before the retried attempt streams.
    Reset,
}

/// What to do with an unterminated final line at clean end of stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailingFrame {
    #[default]
    Discard,
    Flush,
}

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Retry and framing policy for one streaming client.
///
/// # Example
/// ```rust
/// use chatstream::options::{StreamOptions, TrailingFrame};
/// use std::time::Duration;
///
/// let options = StreamOptions::default()
///     .with_max_retries(5)
///     .with_retry_delay(Duration::from_millis(250))
///     .with_trailing_frame(TrailingFrame::Flush);
/// assert_eq!(options.retry_delay(), Duration::from_millis(250));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StreamOptions {
    /// Retries allowed after the first attempt
    pub max_retries: u32,

    /// Fixed delay between attempts, in milliseconds
    pub retry_delay_ms: u64,

    pub retry_content: RetryContent,

    pub trailing_frame: TrailingFrame,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            retry_content: RetryContent::default(),
            trailing_frame: TrailingFrame::default(),
        }
    }
}

impl StreamOptions {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Set the number of retries after the first attempt.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay between attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = saturating_millis(delay);
        self
    }

    /// Set the retry content policy.
    pub fn with_retry_content(mut self, policy: RetryContent) -> Self {
        self.retry_content = policy;
        self
    }

    /// Set the trailing frame policy.
    pub fn with_trailing_frame(mut self, policy: TrailingFrame) -> Self {
        self.trailing_frame = policy;
        self
    }
}

/// Full client configuration, loadable from TOML.
///
/// ```toml
/// endpoint = "http://localhost:5000/api/chat"
/// timeout_ms = 120000
///
/// [stream]
/// max_retries = 3
/// retry_delay_ms = 1000
/// trailing_frame = "discard"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ClientOptions {
    /// Chat endpoint receiving the POST
    pub endpoint: String,

    /// Bearer token sent as `Authorization`, if any
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Whole-request timeout in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// HTTP proxy URL
    #[serde(default)]
    pub proxy: Option<String>,

    /// Additional HTTP headers to include in requests
    #[serde(default)]
    pub extra_headers: Option<HashMap<String, String>>,

    #[serde(default)]
    pub stream: StreamOptions,
}

impl ClientOptions {
    /// Create options for an endpoint with default policies.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            timeout_ms: None,
            proxy: None,
            extra_headers: None,
            stream: StreamOptions::default(),
        }
    }

    /// Parse options from a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ClientError> {
        let options: Self = toml::from_str(source)?;
        options.validate()?;
        Ok(options)
    }

    /// Read and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    fn validate(&self) -> Result<(), ClientError> {
        if self.endpoint.trim().is_empty() {
            return Err(ClientError::Config("endpoint must not be empty".to_string()));
        }
        Ok(())
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<SecretString>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the request timeout. A non-zero timeout is kept at 1 ms or more.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let mut millis = saturating_millis(timeout);
        if millis == 0 && !timeout.is_zero() {
            millis = 1;
        }
        self.timeout_ms = Some(millis);
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }

    /// Replace the stream policies.
    pub fn with_stream(mut self, stream: StreamOptions) -> Self {
        self.stream = stream;
        self
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
