//! Chat transport implementations.

pub mod http;

// Re-export for convenience
pub use http::HttpChatTransport;
