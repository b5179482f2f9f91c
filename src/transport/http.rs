//! HTTP transport: POSTs the chat request and exposes the chunked body.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use std::collections::HashMap;
use tracing::debug;

use crate::client::{ByteStream, ChatTransport, ClientError};
use crate::envelope::error_from_status;
use crate::http::{add_extra_headers, build_http_client};
use crate::model::ChatRequest;
use crate::options::{ClientOptions, SecretString};

/// Chat transport over a reqwest client.
#[derive(Debug, Clone)]
pub struct HttpChatTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
    extra_headers: Option<HashMap<String, String>>,
}

impl HttpChatTransport {
    pub fn new(options: &ClientOptions) -> Result<Self, ClientError> {
        if options.endpoint.trim().is_empty() {
            return Err(ClientError::Config("endpoint must not be empty".to_string()));
        }

        Ok(Self {
            client: build_http_client(options)?,
            endpoint: options.endpoint.clone(),
            api_key: options.api_key.clone(),
            extra_headers: options.extra_headers.clone(),
        })
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream, ClientError> {
        let mut req = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream");

        if let Some(api_key) = &self.api_key {
            req = req.header(AUTHORIZATION, format!("Bearer {}", api_key.expose_secret()));
        }
        req = add_extra_headers(req, &self.extra_headers);

        let response = req.json(request).send().await?;
        let status = response.status();
        debug!(%status, endpoint = %self.endpoint, "Chat endpoint responded");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_status(status, &body));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ClientError::from))
            .boxed())
    }
}
