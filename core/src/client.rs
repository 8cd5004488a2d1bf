//! Request executor for the ERP REST API.
//!
//! # Design
//! `ApiClient` holds the base URL, a [`Transport`] and a [`SessionStore`], and
//! carries no per-call mutable state. A call is split into three steps:
//! `build_request` turns a descriptor into an `HttpRequest`, the transport
//! performs the round trip, and `classify_response` turns the `HttpResponse`
//! into a JSON value or an [`ApiError`]. Building and classifying are pure, so
//! every status and body rule is testable without a server. `execute` glues the
//! steps together and adds the only side effect: clearing the session on 401.
//!
//! Calls are independent. There is no queueing, retry, deduplication or
//! cancellation; callers that need ordering await one call before the next.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::http::{HttpRequest, HttpResponse};
use crate::request::{join_url, RequestDescriptor};
use crate::schema::{Issue, IssueCode, Schema, ValidationError};
use crate::session::{NoopSessionStore, SessionStore, SharedSessionStore};
use crate::transport::{to_header_map, ReqwestTransport, Transport, TransportError};

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn Transport>,
    session: SharedSessionStore,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        transport: Arc<dyn Transport>,
        session: SharedSessionStore,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            session,
        }
    }

    /// Client using `reqwest` and a session store that does nothing on 401.
    pub fn from_config(config: &ApiConfig) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self::new(
            &config.base_url,
            Arc::new(transport),
            Arc::new(NoopSessionStore),
        ))
    }

    pub fn with_session(mut self, session: SharedSessionStore) -> Self {
        self.session = session;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &dyn SessionStore {
        self.session.as_ref()
    }

    pub fn build_request(&self, descriptor: &RequestDescriptor) -> ApiResult<HttpRequest> {
        let body = descriptor
            .body
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ApiError::Serialization(e.to_string()))?;
        let headers = descriptor.merged_headers();
        to_header_map(&headers).map_err(invalid_request)?;
        Ok(HttpRequest {
            method: descriptor.method,
            url: join_url(&self.base_url, &descriptor.path),
            headers,
            body,
        })
    }

    /// Perform one call and return the parsed body, normalized by the
    /// descriptor's schema when one is set.
    pub async fn execute(&self, descriptor: RequestDescriptor) -> ApiResult<Value> {
        let request = self.build_request(&descriptor)?;
        let method = request.method;
        let url = request.url.clone();
        tracing::debug!(%method, %url, "sending request");

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e @ TransportError::InvalidRequest(_)) => {
                tracing::warn!(%method, %url, error = %e, "transport rejected the request");
                return Err(invalid_request(e));
            }
            Err(e) => {
                tracing::warn!(%method, %url, error = %e, "request failed before a response arrived");
                return Err(ApiError::Network(e));
            }
        };
        let status = response.status;

        let result = classify_response(response).and_then(|value| match &descriptor.schema {
            Some(schema) => validate_body(schema, &value),
            None => Ok(value),
        });

        match &result {
            Ok(_) => tracing::debug!(%method, %url, status, "request succeeded"),
            Err(ApiError::Unauthorized) => {
                tracing::warn!(%method, %url, "unauthorized response, clearing session");
                self.session.clear_session();
            }
            Err(e) => tracing::warn!(%method, %url, status, error = %e, "request failed"),
        }
        result
    }

    /// Like [`ApiClient::execute`], then deserialize into `T`.
    ///
    /// Without a schema this is the only shape check the body gets; a mismatch
    /// is reported as a validation failure rather than trusted.
    pub async fn execute_as<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> ApiResult<T> {
        let value = self.execute(descriptor).await?;
        serde_json::from_value(value).map_err(|e| {
            ApiError::Validation(ValidationError::single(Issue::new(
                Vec::new(),
                IssueCode::InvalidType,
                e.to_string(),
            )))
        })
    }
}

/// Map a response to its JSON body or the matching failure.
///
/// Status wins over body: a 401 is `Unauthorized` whatever it carries, and
/// any other non-2xx is an `Http` error with the best-effort parsed body.
pub fn classify_response(response: HttpResponse) -> ApiResult<Value> {
    if response.status == 401 {
        return Err(ApiError::Unauthorized);
    }
    if !response.is_success() {
        let body = serde_json::from_str::<Value>(&response.body)
            .ok()
            .filter(|v| !v.is_null());
        let message = body
            .as_ref()
            .and_then(|b| b.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string);
        return Err(ApiError::Http {
            status: response.status,
            message,
            body,
        });
    }
    match serde_json::from_str::<Value>(&response.body) {
        Ok(Value::Null) | Err(_) => Err(ApiError::InvalidJson),
        Ok(value) => Ok(value),
    }
}

fn invalid_request(err: TransportError) -> ApiError {
    match err {
        TransportError::InvalidRequest(reason) => ApiError::InvalidRequest(reason),
        other => ApiError::Network(other),
    }
}

fn validate_body(schema: &Schema, value: &Value) -> ApiResult<Value> {
    schema.validate(value).map_err(ApiError::Validation)
}
