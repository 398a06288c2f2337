//! Collaborator seams: the identity provider and the row store.
//!
//! Services only talk to `dyn IdentityProvider` and `dyn RowStore`. The hosted
//! implementation lives in [`supabase`]; [`memory`] keeps everything in process
//! for local runs and tests.

pub mod memory;
pub mod query;
pub mod supabase;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{AppConfig, BackendKind};

pub use memory::MemoryBackend;
pub use query::{FilterOp, Operation, Row, RowQuery, SortDirection};
pub use supabase::SupabaseBackend;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
}

/// Sign-up may return a user without a session (confirmation pending).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthResponse {
    pub user: Option<AuthUser>,
    pub session: Option<AuthSession>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    /// Network failure or a temporarily unavailable auth service.
    #[error("Retryable auth error: {0}")]
    Retryable(String),

    /// The provider understood the request and refused it.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Unexpected auth error: {0}")]
    Unexpected(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, credentials: &Credentials) -> Result<AuthResponse, AuthError>;

    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<AuthResponse, AuthError>;
}

/// Raw row-store reply. `data: None` means the statement failed; `error`
/// carries whatever detail the backend supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreResponse {
    pub data: Option<Vec<Row>>,
    pub error: Option<Value>,
}

impl StoreResponse {
    pub fn rows(rows: Vec<Row>) -> Self {
        Self {
            data: Some(rows),
            error: None,
        }
    }

    pub fn failed(error: Value) -> Self {
        Self {
            data: None,
            error: Some(error),
        }
    }
}

/// The statement never reached the backend or its reply could not be read.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Row store request failed: {0}")]
    Transport(String),

    #[error("Row store returned an unreadable body: {0}")]
    Decode(String),
}

#[async_trait]
pub trait RowStore: Send + Sync {
    async fn execute(&self, query: &RowQuery) -> Result<StoreResponse, StoreError>;
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

/// Identity provider and row store selected by configuration.
#[derive(Clone)]
pub struct Backends {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn RowStore>,
}

impl Backends {
    pub fn from_config(config: &AppConfig) -> Result<Self, BackendError> {
        match config.backend.kind {
            BackendKind::Supabase => {
                let backend = Arc::new(SupabaseBackend::new(&config.backend)?);
                Ok(Self {
                    identity: backend.clone(),
                    store: backend,
                })
            }
            BackendKind::Memory => {
                let backend = Arc::new(MemoryBackend::new(
                    config.security.token_secret.clone(),
                    config.security.token_expiry_hours,
                ));
                Ok(Self::shared(backend))
            }
        }
    }

    /// One object serving both roles.
    pub fn shared<B>(backend: Arc<B>) -> Self
    where
        B: IdentityProvider + RowStore + 'static,
    {
        Self {
            identity: backend.clone(),
            store: backend,
        }
    }
}
