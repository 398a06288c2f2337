use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use super::{
    AuthError, AuthResponse, AuthSession, AuthUser, BackendError, Credentials, IdentityProvider, Operation, Row,
    RowQuery, RowStore, StoreError, StoreResponse,
};
use crate::config::BackendConfig;

/// Hosted backend: GoTrue for identity, PostgREST for rows.
pub struct SupabaseBackend {
    http: reqwest::Client,
    base: Url,
    api_key: String,
}

impl SupabaseBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        // Url::join drops the last path segment unless it ends with '/'
        let mut raw = config.url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base = Url::parse(&raw).map_err(|_| BackendError::InvalidUrl(config.url.clone()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base,
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base.join(path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn auth_request(&self, path: &str, credentials: &Credentials) -> Result<AuthResponse, AuthError> {
        let url = self
            .endpoint(path)
            .map_err(|e| AuthError::Unexpected(format!("invalid auth endpoint: {}", e)))?;

        let response = self
            .authorized(self.http.post(url))
            .json(&json!({ "email": credentials.email, "password": credentials.password }))
            .send()
            .await
            .map_err(|e| AuthError::Retryable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Retryable(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_auth_failure(status, &body));
        }

        let payload: Value = serde_json::from_str(&body)
            .map_err(|e| AuthError::Unexpected(format!("unreadable auth response: {}", e)))?;
        Ok(parse_auth_payload(&payload))
    }
}

#[async_trait]
impl IdentityProvider for SupabaseBackend {
    async fn sign_up(&self, credentials: &Credentials) -> Result<AuthResponse, AuthError> {
        self.auth_request("auth/v1/signup", credentials).await
    }

    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<AuthResponse, AuthError> {
        self.auth_request("auth/v1/token?grant_type=password", credentials).await
    }
}

#[async_trait]
impl RowStore for SupabaseBackend {
    async fn execute(&self, query: &RowQuery) -> Result<StoreResponse, StoreError> {
        let url = self
            .endpoint(&format!("rest/v1/{}", query.table))
            .map_err(|e| StoreError::Transport(format!("invalid table endpoint: {}", e)))?;

        let builder = match &query.operation {
            Operation::Select(_) => self.http.get(url),
            Operation::Insert(row) => self.http.post(url).json(row),
            Operation::Update(row) => self.http.patch(url).json(row),
            Operation::Delete => self.http.delete(url),
        };

        let response = self
            .authorized(builder)
            .header("Prefer", "return=representation")
            .query(&query.to_query_params())
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        tracing::debug!(table = %query.table, status = status.as_u16(), "Row store response");

        if status.is_success() {
            parse_rows(&body).map(StoreResponse::rows)
        } else {
            let detail = serde_json::from_str::<Value>(&body).unwrap_or(Value::String(body));
            Ok(StoreResponse::failed(json!({ "status": status.as_u16(), "error": detail })))
        }
    }
}

fn parse_rows(body: &str) -> Result<Vec<Row>, StoreError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<Value>(body).map_err(|e| StoreError::Decode(e.to_string()))? {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(row) => Some(row),
                _ => None,
            })
            .collect()),
        Value::Object(row) => Ok(vec![row]),
        other => Err(StoreError::Decode(format!("expected rows, got {}", other))),
    }
}

/// Token responses carry `user` next to the tokens; a sign-up awaiting
/// confirmation returns the bare user object.
pub(crate) fn parse_auth_payload(body: &Value) -> AuthResponse {
    let session = match (
        body.get("access_token").and_then(Value::as_str),
        body.get("refresh_token").and_then(Value::as_str),
    ) {
        (Some(access), Some(refresh)) => Some(AuthSession {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
        }),
        _ => None,
    };

    let user_value = match body.get("user") {
        Some(user @ Value::Object(_)) => Some(user),
        _ if body.get("id").is_some() => Some(body),
        _ => None,
    };
    let user = user_value.and_then(|v| serde_json::from_value::<AuthUser>(v.clone()).ok());

    AuthResponse { user, session }
}

pub(crate) fn classify_auth_failure(status: StatusCode, body: &str) -> AuthError {
    if matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    ) {
        return AuthError::Retryable(format!("auth service answered {}", status));
    }

    match serde_json::from_str::<Value>(body) {
        Ok(value) => AuthError::Api {
            status: status.as_u16(),
            message: error_message(&value).unwrap_or_else(|| status.to_string()),
        },
        Err(_) => AuthError::Unexpected(format!("auth service answered {} with a non-JSON body", status)),
    }
}

fn error_message(body: &Value) -> Option<String> {
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}
