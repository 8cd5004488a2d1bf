//! Classification properties exercised through `ApiClient::execute` with a
//! scripted transport, so every status/body combination is reachable without
//! a server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use erp_api::{
    ApiClient, ApiError, AuthApi, HttpMethod, HttpRequest, HttpResponse, RequestDescriptor,
    Schema, Session, SessionStore, SignInForm, Transport, TransportError,
};
use serde_json::{json, Value};

/// Answers every request with the same response and records what was sent.
struct FixedTransport {
    status: u16,
    body: String,
    sent: Mutex<Vec<HttpRequest>>,
}

impl FixedTransport {
    fn new(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            status,
            body: body.to_string(),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FixedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.sent.lock().unwrap().push(request);
        Ok(HttpResponse::new(self.status, self.body.clone()))
    }
}

struct DownTransport;

#[async_trait]
impl Transport for DownTransport {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        Err(TransportError::Connect("dns lookup failed".to_string()))
    }
}

#[derive(Default)]
struct CountingStore {
    clears: AtomicUsize,
}

impl SessionStore for CountingStore {
    fn current_session(&self) -> Option<Session> {
        None
    }

    fn save_session(&self, _session: Session) {}

    fn clear_session(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

fn client(transport: Arc<dyn Transport>, store: Arc<CountingStore>) -> ApiClient {
    ApiClient::new("http://erp.test", transport, store)
}

fn fixed(status: u16, body: &str) -> (ApiClient, Arc<FixedTransport>, Arc<CountingStore>) {
    let transport = FixedTransport::new(status, body);
    let store = Arc::new(CountingStore::default());
    (client(transport.clone(), store.clone()), transport, store)
}

const BODIES: [&str; 5] = [
    r#"{"message":"boom"}"#,
    r#"[1,2,3]"#,
    "plain text",
    "",
    r#"{"message":"Unauthorized","token":"x"}"#,
];

#[tokio::test]
async fn non_2xx_non_401_is_always_a_failure() {
    for status in [300, 400, 403, 404, 409, 422, 500, 503] {
        for body in BODIES {
            let (client, _, store) = fixed(status, body);
            let err = client
                .execute(RequestDescriptor::get("api/x"))
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::Http { .. }), "{status} {body:?}");
            assert_eq!(err.status(), Some(status));
            assert!(err.message().starts_with(&format!("HTTP error {status}")));
            assert_eq!(store.clears.load(Ordering::SeqCst), 0);
        }
    }
}

#[tokio::test]
async fn every_401_clears_session_once_per_call() {
    for body in BODIES {
        let (client, _, store) = fixed(401, body);
        for call in 1..=3 {
            let err = client
                .execute(RequestDescriptor::post("api/exchange/add-currency").authorization("Bearer expired"))
                .await
                .unwrap_err();
            assert_eq!(err.message(), "Unauthorized access");
            assert_eq!(err.status(), Some(401));
            assert_eq!(err.details(), None);
            assert_eq!(store.clears.load(Ordering::SeqCst), call);
        }
    }
}

#[tokio::test]
async fn unparsable_2xx_is_invalid_json() {
    for status in [200, 201, 204] {
        for body in ["not-json{", "", "   ", "null", "{\"a\":"] {
            let (client, _, _) = fixed(status, body);
            let err = client.execute(RequestDescriptor::get("api/x")).await.unwrap_err();
            assert_eq!(err.message(), "Invalid JSON response", "{status} {body:?}");
            assert_eq!(err.status(), Some(400));
        }
    }
}

#[tokio::test]
async fn well_formed_2xx_without_schema_is_identity() {
    let bodies = [
        json!([{"currencyId": 1, "currencyCode": "USD", "baseCurrency": true}]),
        json!({"voucherNo": "JV-0001", "lines": [{"debit": 100.25, "credit": 0}], "meta": null}),
        json!("ok"),
        json!(0),
        json!(false),
        json!([]),
    ];
    for body in bodies {
        let (client, _, _) = fixed(200, &body.to_string());
        let value = client.execute(RequestDescriptor::get("api/x")).await.unwrap();
        assert_eq!(value, body);
    }
}

#[tokio::test]
async fn schema_success_returns_normalized_value() {
    let (client, _, _) = fixed(200, r#"{"token":"t","userId":"4","username":"u","extra":1}"#);
    let schema = erp_api::auth::sign_in_response_schema();
    let value = client
        .execute(RequestDescriptor::post("api/auth/login").schema(schema))
        .await
        .unwrap();
    assert_eq!(value, json!({"token": "t", "userId": 4, "username": "u"}));
}

#[tokio::test]
async fn schema_failure_lists_one_issue_per_violation() {
    let (client, _, _) = fixed(200, r#"{"userId":"abc","role":5}"#);
    let err = client
        .execute(RequestDescriptor::post("api/auth/login").schema(erp_api::auth::sign_in_response_schema()))
        .await
        .unwrap_err();
    assert_eq!(err.message(), "Response validation failed");
    assert_eq!(err.status(), Some(400));

    let details = err.details().unwrap();
    let paths: Vec<Value> = details
        .as_array()
        .unwrap()
        .iter()
        .map(|issue| issue["path"].clone())
        .collect();
    assert_eq!(
        paths,
        vec![json!(["token"]), json!(["userId"]), json!(["username"]), json!(["role"])]
    );
}

#[tokio::test]
async fn status_is_checked_before_schema() {
    let (client, _, _) = fixed(500, r#"{"message":"db down"}"#);
    let err = client
        .execute(RequestDescriptor::get("api/x").schema(Schema::object([("token", Schema::string())])))
        .await
        .unwrap_err();
    assert_eq!(err.message(), "HTTP error 500: db down");
}

#[tokio::test]
async fn transport_failure_is_network_error() {
    let store = Arc::new(CountingStore::default());
    let client = client(Arc::new(DownTransport), store.clone());
    let err = client.execute(RequestDescriptor::get("api/x")).await.unwrap_err();
    assert_eq!(err.message(), "Network error occurred");
    assert_eq!(err.status(), Some(500));
    assert_eq!(store.clears.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn identical_calls_yield_identical_results() {
    let cases = [
        (200, r#"{"a":1}"#),
        (200, "not-json{"),
        (404, r#"{"message":"missing"}"#),
        (401, ""),
    ];
    for (status, body) in cases {
        let (client, _, _) = fixed(status, body);
        let first = client
            .execute(RequestDescriptor::get("api/x"))
            .await
            .map_err(|e| e.to_failure());
        let second = client
            .execute(RequestDescriptor::get("api/x"))
            .await
            .map_err(|e| e.to_failure());
        assert_eq!(first, second, "{status} {body:?}");
    }
}

#[tokio::test]
async fn transport_sees_merged_headers_and_body() {
    let (client, transport, _) = fixed(200, "{}");

    client
        .execute(RequestDescriptor::get("/api/exchange/get-all-currency"))
        .await
        .unwrap();
    client
        .execute(
            RequestDescriptor::patch("api/asset/vehicle/3")
                .authorization("tok")
                .header("content-type", "application/merge-patch+json")
                .body(json!({"plateNo": "LEA-1234"})),
        )
        .await
        .unwrap();

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);

    assert_eq!(sent[0].method, HttpMethod::Get);
    assert_eq!(sent[0].url, "http://erp.test/api/exchange/get-all-currency");
    assert_eq!(sent[0].header("Content-Type"), Some("application/json"));
    assert!(sent[0].body.is_none());

    assert_eq!(sent[1].method, HttpMethod::Patch);
    assert_eq!(sent[1].header("Content-Type"), Some("application/merge-patch+json"));
    assert_eq!(sent[1].header("Authorization"), Some("tok"));
    assert_eq!(sent[1].headers.len(), 2);
    let body: Value = serde_json::from_str(sent[1].body.as_deref().unwrap()).unwrap();
    assert_eq!(body, json!({"plateNo": "LEA-1234"}));
}

#[tokio::test]
async fn typed_call_without_schema_reports_shape_mismatch() {
    let (client, _, _) = fixed(200, r#"{"currencyId":"not-a-number"}"#);
    let err = client
        .execute_as::<erp_api::Currency>(RequestDescriptor::get("api/x"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn malformed_header_is_rejected_before_sending() {
    let (client, transport, store) = fixed(200, "{}");
    let err = client
        .execute(RequestDescriptor::get("api/auth/profile").authorization("Bearer tok\nen"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest(_)));
    assert_eq!(err.message(), "Invalid request");
    assert_ne!(err.status(), Some(500));
    assert!(transport.sent().is_empty());
    assert_eq!(store.clears.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn sign_in_accepts_integral_float_user_id() {
    let (client, _, _) = fixed(200, r#"{"token":"t","userId":1.0,"username":"u"}"#);
    let auth = AuthApi::new(client);
    let signed_in = auth
        .sign_in(&SignInForm {
            username: "u".to_string(),
            password: "p".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(signed_in.user_id, 1);
    assert_eq!(signed_in.token, "t");
}
