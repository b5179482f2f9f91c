//! HTTP client utilities shared by the chat transport and collaborator clients.

use reqwest::{Client, RequestBuilder};
use std::collections::HashMap;
use tracing::warn;

use crate::options::ClientOptions;

/// Build a configured HTTP client from client options.
///
/// This applies common configuration like timeouts and proxies.
///
/// # Example
/// ```ignore
/// let client = build_http_client(&options)?;
/// ```
pub fn build_http_client(options: &ClientOptions) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder();

    if let Some(timeout) = options.timeout() {
        builder = builder.timeout(timeout);
    }

    if let Some(proxy_url) = &options.proxy {
        match reqwest::Proxy::all(proxy_url) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(e) => warn!(proxy = %proxy_url, "Ignoring invalid proxy: {}", e),
        }
    }

    builder.build()
}

/// Add extra headers to a request if any are configured.
pub fn add_extra_headers(
    mut request: RequestBuilder,
    extra_headers: &Option<HashMap<String, String>>,
) -> RequestBuilder {
    if let Some(headers) = extra_headers {
        for (key, value) in headers {
            request = request.header(key, value);
        }
    }
    request
}
