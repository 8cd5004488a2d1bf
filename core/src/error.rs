//! Failure side of the result envelope.
//!
//! # Design
//! Every executor call resolves to `ApiResult<T>`. The `Ok` arm is the success
//! variant, `ApiError` is the failure variant, so "exactly one of value or
//! failure" holds by construction. Each variant maps to a fixed user-facing
//! message and status so callers can branch on `status()` the same way for
//! every endpoint; `details()` carries whatever structured context exists
//! (the server's error body or the validation issues).

use serde::Serialize;
use serde_json::Value;

use crate::schema::ValidationError;
use crate::transport::TransportError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Sentinel status reported when no HTTP response was received.
pub const NETWORK_ERROR_STATUS: u16 = 500;

/// Errors returned by `ApiClient` calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The transport could not produce a response at all.
    #[error("Network error occurred")]
    Network(#[source] TransportError),

    /// The server returned 401. Any body is discarded.
    #[error("Unauthorized access")]
    Unauthorized,

    /// The server returned a non-2xx status other than 401.
    #[error("{}", http_message(.status, .message))]
    Http {
        status: u16,
        message: Option<String>,
        body: Option<Value>,
    },

    /// A 2xx response whose body is empty or not JSON.
    #[error("Invalid JSON response")]
    InvalidJson,

    /// The parsed body does not have the expected shape.
    #[error("Response validation failed")]
    Validation(#[source] ValidationError),

    /// Caller-supplied input was rejected before any request was sent.
    #[error("Request validation failed")]
    InvalidInput(#[source] ValidationError),

    /// The request payload could not be serialized to JSON.
    #[error("Request serialization failed")]
    Serialization(String),

    /// The request cannot be put on the wire, e.g. a header value with a
    /// line break. Nothing was sent.
    #[error("Invalid request")]
    InvalidRequest(String),
}

fn http_message(status: &u16, message: &Option<String>) -> String {
    match message.as_deref() {
        Some(message) => format!("HTTP error {status}: {message}"),
        None => format!("HTTP error {status}"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Network,
    Unauthorized,
    Http,
    InvalidJson,
    Validation,
    InvalidInput,
    Serialization,
    InvalidRequest,
}

/// Serializable snapshot of a failure, shaped the way UI code consumes it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ApiError::Network(_) => FailureKind::Network,
            ApiError::Unauthorized => FailureKind::Unauthorized,
            ApiError::Http { .. } => FailureKind::Http,
            ApiError::InvalidJson => FailureKind::InvalidJson,
            ApiError::Validation(_) => FailureKind::Validation,
            ApiError::InvalidInput(_) => FailureKind::InvalidInput,
            ApiError::Serialization(_) => FailureKind::Serialization,
            ApiError::InvalidRequest(_) => FailureKind::InvalidRequest,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Network(_) => Some(NETWORK_ERROR_STATUS),
            ApiError::Unauthorized => Some(401),
            ApiError::Http { status, .. } => Some(*status),
            ApiError::InvalidJson | ApiError::Validation(_) | ApiError::InvalidInput(_) => {
                Some(400)
            }
            ApiError::Serialization(_) | ApiError::InvalidRequest(_) => None,
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            ApiError::Http { body, .. } => body.clone(),
            ApiError::Validation(err) | ApiError::InvalidInput(err) => Some(err.to_details()),
            ApiError::Serialization(reason) | ApiError::InvalidRequest(reason) => {
                Some(Value::String(reason.clone()))
            }
            ApiError::Network(_) | ApiError::Unauthorized | ApiError::InvalidJson => None,
        }
    }

    /// Validation issues, for either response or input validation failures.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            ApiError::Validation(err) | ApiError::InvalidInput(err) => Some(err),
            _ => None,
        }
    }

    pub fn to_failure(&self) -> Failure {
        Failure {
            message: self.message(),
            status: self.status(),
            details: self.details(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Issue, IssueCode, PathSegment};
    use serde_json::json;

    #[test]
    fn fixed_messages_and_statuses() {
        let cases = [
            (ApiError::Network(TransportError::Connect("refused".into())), "Network error occurred", Some(500)),
            (ApiError::Unauthorized, "Unauthorized access", Some(401)),
            (ApiError::InvalidJson, "Invalid JSON response", Some(400)),
            (ApiError::Serialization("bad".into()), "Request serialization failed", None),
            (ApiError::InvalidRequest("bad header".into()), "Invalid request", None),
        ];
        for (err, message, status) in cases {
            assert_eq!(err.message(), message);
            assert_eq!(err.status(), status);
        }
    }

    #[test]
    fn http_message_embeds_status_and_server_message() {
        let err = ApiError::Http {
            status: 404,
            message: Some("Currency not found".into()),
            body: Some(json!({"message": "Currency not found"})),
        };
        assert_eq!(err.message(), "HTTP error 404: Currency not found");
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.details(), Some(json!({"message": "Currency not found"})));

        let bare = ApiError::Http {
            status: 503,
            message: None,
            body: None,
        };
        assert_eq!(bare.message(), "HTTP error 503");
        assert_eq!(bare.details(), None);
    }

    #[test]
    fn validation_failure_carries_issues_as_details() {
        let err = ApiError::Validation(ValidationError::single(Issue::new(
            vec![PathSegment::Key("token".into())],
            IssueCode::Required,
            "Required",
        )));
        assert_eq!(err.message(), "Response validation failed");
        assert_eq!(err.kind(), FailureKind::Validation);
        let failure = err.to_failure();
        assert_eq!(failure.status, Some(400));
        assert_eq!(failure.details.unwrap()[0]["path"], json!(["token"]));
    }

    #[test]
    fn failure_snapshot_omits_absent_fields() {
        let json = serde_json::to_value(ApiError::InvalidJson.to_failure()).unwrap();
        assert_eq!(json, json!({"message": "Invalid JSON response", "status": 400}));
    }
}
