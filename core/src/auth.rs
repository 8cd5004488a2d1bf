//! Sign-in, registration and sign-out on top of [`ApiClient`].
//!
//! Forms are checked against their schema before anything is sent, and the
//! sign-in response must match [`sign_in_response_schema`] before a session is
//! stored.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::request::RequestDescriptor;
use crate::schema::{NumberRules, Schema, StringRules};
use crate::session::Session;

pub const SIGN_IN_PATH: &str = "api/auth/login";
pub const REGISTER_PATH: &str = "api/auth/register";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub token: String,
    pub user_id: i64,
    pub username: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl From<SignInResponse> for Session {
    fn from(resp: SignInResponse) -> Self {
        Session {
            token: resp.token,
            user_id: resp.user_id,
            username: resp.username,
            role: resp.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

fn required(message: &str) -> Schema {
    Schema::String(StringRules::default().min_len(1, message))
}

pub fn sign_in_form_schema() -> Schema {
    Schema::object([
        ("username", required("Username is required")),
        ("password", required("Password is required")),
    ])
}

pub fn sign_in_response_schema() -> Schema {
    Schema::object([
        ("token", required("Token must not be empty")),
        ("userId", Schema::Number(NumberRules::default().coerce().integer())),
        ("username", Schema::string()),
        ("role", Schema::string().nullable().optional()),
    ])
}

pub fn sign_up_form_schema() -> Schema {
    Schema::object([
        (
            "username",
            Schema::String(StringRules::default().min_len(3, "Username must be at least 3 characters")),
        ),
        (
            "email",
            required("Email is required").refine(std::iter::empty::<&str>(), "Invalid email address", |v| {
                v.as_str().is_some_and(looks_like_email)
            }),
        ),
        (
            "password",
            Schema::String(StringRules::default().min_len(6, "Password must be at least 6 characters")),
        ),
        ("confirmPassword", required("Please confirm your password")),
    ])
    .refine(["confirmPassword"], "Passwords do not match", |v| {
        v["password"] == v["confirmPassword"]
    })
}

fn looks_like_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

fn check_input<T: Serialize>(schema: &Schema, form: &T) -> ApiResult<Value> {
    let value = serde_json::to_value(form).map_err(|e| ApiError::Serialization(e.to_string()))?;
    schema.validate(&value).map_err(ApiError::InvalidInput)
}

#[derive(Debug, Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Validate the form, sign in, and store the resulting session.
    pub async fn sign_in(&self, form: &SignInForm) -> ApiResult<SignInResponse> {
        let body = check_input(&sign_in_form_schema(), form)?;
        let descriptor = RequestDescriptor::post(SIGN_IN_PATH)
            .body(body)
            .schema(sign_in_response_schema());
        let response: SignInResponse = self.client.execute_as(descriptor).await?;

        tracing::info!(user_id = response.user_id, username = %response.username, "signed in");
        self.client.session().save_session(response.clone().into());
        Ok(response)
    }

    /// Validate the form and create an account. The confirmation field is
    /// only checked locally and never sent.
    pub async fn register(&self, form: &SignUpForm) -> ApiResult<Value> {
        let checked = check_input(&sign_up_form_schema(), form)?;
        let body = json!({
            "username": checked["username"],
            "email": checked["email"],
            "password": checked["password"],
        });
        self.client
            .execute(RequestDescriptor::post(REGISTER_PATH).body(body))
            .await
    }

    pub fn sign_out(&self) {
        self.client.session().clear_session();
    }

    pub fn current_session(&self) -> Option<Session> {
        self.client.session().current_session()
    }
}
