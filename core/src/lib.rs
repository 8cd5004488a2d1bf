//! Typed request/response boundary for the ERP REST API.
//!
//! # Overview
//! [`ApiClient::execute`] sends one request described by a
//! [`RequestDescriptor`] and resolves every outcome (network failure, 401,
//! other HTTP errors, malformed JSON, schema mismatch) into an [`ApiResult`]
//! instead of panicking or leaking transport errors. An optional [`Schema`]
//! checks and normalizes the parsed body before the caller sees it.
//!
//! # Design
//! - `ApiClient` is stateless apart from its base URL, transport and session
//!   store, all fixed at construction.
//! - Requests and responses cross the [`Transport`] seam as plain data, so the
//!   classification rules are tested without a server.
//! - Entity payloads (vouchers, assets, currencies) stay opaque JSON unless the
//!   caller asks for a concrete type.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod request;
pub mod schema;
pub mod session;
pub mod transport;
pub mod types;

pub use auth::{AuthApi, SignInForm, SignInResponse, SignUpForm};
pub use client::{classify_response, ApiClient};
pub use config::{ApiConfig, ConfigError};
pub use error::{ApiError, ApiResult, Failure, FailureKind};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use request::RequestDescriptor;
pub use schema::{Issue, IssueCode, NumberRules, PathSegment, Schema, StringRules, ValidationError};
pub use session::{MemorySessionStore, NoopSessionStore, Session, SessionStore, SharedSessionStore};
pub use transport::{ReqwestTransport, Transport, TransportError};
pub use types::{Currency, NewCurrency};
