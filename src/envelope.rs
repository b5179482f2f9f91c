//! Response envelope used by the backend's JSON collaborator endpoints.
//!
//! Collaborators answer with `{ "success": true, ...payload }` or
//! `{ "success": false, "error": "..." }`, and may also fail with a
//! non-success HTTP status. Both failure forms end up as a `ClientError`.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::client::ClientError;

/// `{ success, error?, ...payload }`. A body without `success` counts as
/// successful.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default = "succeeded")]
    pub success: bool,

    #[serde(default)]
    pub error: Option<String>,

    #[serde(flatten)]
    pub payload: T,
}

impl<T> ApiEnvelope<T> {
    /// Return the payload, or `ClientError::Api` when `success` is false.
    pub fn into_result(self) -> Result<T, ClientError> {
        if self.success {
            Ok(self.payload)
        } else {
            Err(ClientError::Api(
                self.error
                    .unwrap_or_else(|| "request was not successful".to_string()),
            ))
        }
    }
}

fn succeeded() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default = "succeeded")]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Build an error for a non-success response, preferring the body's
/// `error` or `message` field over the raw body text.
pub fn error_from_status(status: StatusCode, body: &str) -> ClientError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error.or(b.message))
        .unwrap_or_else(|| body.trim().to_string());

    ClientError::Status { status, message }
}

/// Read a collaborator response, handling both failure forms.
pub async fn read_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(error_from_status(status, &body));
    }

    // Check the failure form first so a failed body need not carry the payload.
    let probe: ErrorBody = serde_json::from_str(&body)?;
    if !probe.success {
        return Err(ClientError::Api(
            probe
                .error
                .or(probe.message)
                .unwrap_or_else(|| "request was not successful".to_string()),
        ));
    }

    let envelope: ApiEnvelope<T> = serde_json::from_str(&body)?;
    envelope.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::collections::HashMap;

    #[derive(Debug, Deserialize)]
    struct Agents {
        agents: Vec<Value>,
    }

    #[test]
    fn test_envelope_success() {
        let envelope: ApiEnvelope<Agents> =
            serde_json::from_str(r#"{"success": true, "agents": [{"id": 1}]}"#).unwrap();
        assert_eq!(envelope.into_result().unwrap().agents.len(), 1);
    }

    #[test]
    fn test_envelope_without_success_field() {
        let envelope: ApiEnvelope<Agents> = serde_json::from_str(r#"{"agents": []}"#).unwrap();
        assert!(envelope.into_result().unwrap().agents.is_empty());
    }

    #[test]
    fn test_envelope_failure() {
        let envelope: ApiEnvelope<HashMap<String, Value>> =
            serde_json::from_str(r#"{"success": false, "error": "Agent not found"}"#).unwrap();
        match envelope.into_result() {
            Err(ClientError::Api(message)) => assert_eq!(message, "Agent not found"),
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_error_from_status_prefers_json_field() {
        let err = error_from_status(
            StatusCode::BAD_REQUEST,
            r#"{"success": false, "error": "bad input", "error_type": "InterpreterError"}"#,
        );
        match err {
            ClientError::Status { status, message } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, "bad input");
            }
            other => panic!("unexpected {:?}", other),
        }

        let err = error_from_status(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(err.to_string(), "HTTP 502 Bad Gateway: upstream down");
    }
}
