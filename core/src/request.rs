//! Per-call request descriptors.
//!
//! A descriptor names a path relative to the client's base URL, a method, an
//! optional JSON body, extra headers and an optional response [`Schema`].
//! It is built fresh for each call and consumed by `ApiClient::execute`.

use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::schema::Schema;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const AUTHORIZATION: &str = "Authorization";
pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Default)]
pub struct RequestDescriptor {
    pub path: String,
    pub method: HttpMethod,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    pub schema: Option<Schema>,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            ..Self::default()
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `payload` as the JSON body.
    pub fn json<B: Serialize + ?Sized>(self, payload: &B) -> Result<Self, ApiError> {
        let body = serde_json::to_value(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(self.body(body))
    }

    /// Add or replace a header. Names compare case-insensitively.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Set `Authorization` to `token` exactly as given (callers include any
    /// `Bearer ` prefix themselves).
    pub fn authorization(self, token: impl Into<String>) -> Self {
        self.header(AUTHORIZATION, token)
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Default headers with the caller's headers merged over them.
    pub fn merged_headers(&self) -> Vec<(String, String)> {
        let mut merged = Vec::with_capacity(self.headers.len() + 1);
        if !self
            .headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case(CONTENT_TYPE))
        {
            merged.push((CONTENT_TYPE.to_string(), JSON_CONTENT_TYPE.to_string()));
        }
        merged.extend(self.headers.iter().cloned());
        merged
    }
}

/// Join a base URL and a relative path with exactly one `/` between them.
pub fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}
