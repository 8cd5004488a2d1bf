//! In-memory stand-in for the ERP REST backend.
//!
//! Serves the handful of endpoints the client tests need: currencies, sign-in
//! and registration, a token-protected profile, and a few routes that answer
//! with deliberately broken bodies.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Currency {
    pub currency_id: i64,
    pub currency_code: String,
    pub base_currency: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCurrency {
    pub currency_code: String,
    #[serde(default)]
    pub base_currency: bool,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
}

/// Login name whose sign-in response omits the token, mimicking an older
/// backend build.
pub const LEGACY_USER: &str = "legacy";

#[derive(Default)]
pub struct Store {
    currencies: BTreeMap<i64, Currency>,
    users: HashMap<String, User>,
    tokens: HashMap<String, String>,
}

impl Store {
    pub fn seeded() -> Self {
        let mut store = Store::default();
        store.currencies.insert(
            1,
            Currency {
                currency_id: 1,
                currency_code: "USD".to_string(),
                base_currency: true,
            },
        );
        for (user_id, username, password, role) in [
            (1, "admin", "admin123", Some("admin")),
            (2, LEGACY_USER, "legacy123", None),
        ] {
            store.users.insert(
                username.to_string(),
                User {
                    user_id,
                    username: username.to_string(),
                    email: format!("{username}@erp.local"),
                    password: password.to_string(),
                    role: role.map(str::to_string),
                },
            );
        }
        store
    }

    fn next_currency_id(&self) -> i64 {
        self.currencies.keys().next_back().copied().unwrap_or(0) + 1
    }

    fn next_user_id(&self) -> i64 {
        self.users.values().map(|u| u.user_id).max().unwrap_or(0) + 1
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    app_with(Store::seeded())
}

pub fn app_with(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/api/exchange/get-all-currency", get(list_currencies))
        .route("/api/exchange/add-currency", post(add_currency))
        .route("/api/exchange/currency/{id}", delete(delete_currency))
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/profile", get(profile))
        .route("/api/debug/malformed", get(malformed))
        .route("/api/debug/empty", get(empty))
        .route("/api/debug/teapot", get(teapot))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

type ApiFailure = (StatusCode, Json<Value>);

fn failure(status: StatusCode, message: &str) -> ApiFailure {
    (status, Json(json!({ "message": message })))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    Some(raw.strip_prefix("Bearer ").unwrap_or(raw).trim())
}

fn authorize(store: &Store, headers: &HeaderMap) -> Result<User, ApiFailure> {
    let unauthorized = || failure(StatusCode::UNAUTHORIZED, "Token is invalid or expired");
    let token = bearer_token(headers).ok_or_else(unauthorized)?;
    let username = store.tokens.get(token).ok_or_else(unauthorized)?;
    store.users.get(username).cloned().ok_or_else(unauthorized)
}

async fn list_currencies(State(db): State<Db>) -> Json<Vec<Currency>> {
    let store = db.read().await;
    Json(store.currencies.values().cloned().collect())
}

async fn add_currency(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<NewCurrency>,
) -> Result<(StatusCode, Json<Currency>), ApiFailure> {
    let mut store = db.write().await;
    authorize(&store, &headers)?;
    let code = input.currency_code.trim().to_uppercase();
    if code.is_empty() {
        return Err(failure(StatusCode::BAD_REQUEST, "Currency code is required"));
    }
    if store.currencies.values().any(|c| c.currency_code == code) {
        return Err(failure(StatusCode::BAD_REQUEST, "Currency code already exists"));
    }
    let currency = Currency {
        currency_id: store.next_currency_id(),
        currency_code: code,
        base_currency: input.base_currency,
    };
    store.currencies.insert(currency.currency_id, currency.clone());
    tracing::info!(currency_id = currency.currency_id, code = %currency.currency_code, "currency added");
    Ok((StatusCode::CREATED, Json(currency)))
}

async fn delete_currency(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiFailure> {
    let mut store = db.write().await;
    authorize(&store, &headers)?;
    store
        .currencies
        .remove(&id)
        .map(|_| Json(json!({ "message": "Currency deleted" })))
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Currency not found"))
}

async fn login(State(db): State<Db>, Json(input): Json<LoginRequest>) -> Result<Json<Value>, ApiFailure> {
    let mut store = db.write().await;
    let user = store
        .users
        .get(&input.username)
        .filter(|u| u.password == input.password)
        .cloned()
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "Invalid credentials"))?;

    if user.username == LEGACY_USER {
        return Ok(Json(json!({ "userId": user.user_id, "username": user.username })));
    }

    let token = Uuid::new_v4().to_string();
    store.tokens.insert(token.clone(), user.username.clone());
    tracing::info!(user_id = user.user_id, "issued token");
    Ok(Json(json!({
        "token": token,
        "userId": user.user_id,
        "username": user.username,
        "role": user.role,
    })))
}

async fn register(
    State(db): State<Db>,
    Json(input): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiFailure> {
    let mut store = db.write().await;
    if store.users.contains_key(&input.username) {
        return Err(failure(StatusCode::CONFLICT, "Username already taken"));
    }
    let user = User {
        user_id: store.next_user_id(),
        username: input.username,
        email: input.email,
        password: input.password,
        role: None,
    };
    let body = json!({ "userId": user.user_id, "username": user.username, "email": user.email });
    store.users.insert(user.username.clone(), user);
    Ok((StatusCode::CREATED, Json(body)))
}

async fn profile(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>, ApiFailure> {
    let store = db.read().await;
    let user = authorize(&store, &headers)?;
    Ok(Json(json!({
        "userId": user.user_id,
        "username": user.username,
        "email": user.email,
        "role": user.role,
    })))
}

async fn malformed() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        "not-json{",
    )
        .into_response()
}

async fn empty() -> StatusCode {
    StatusCode::OK
}

async fn teapot() -> (StatusCode, &'static str) {
    (StatusCode::IM_A_TEAPOT, "short and stout")
}
