//! Registration and login on top of the identity provider.
//!
//! Registration is two phases: the identity provider creates the account, then
//! a profile row is written to `users`. The phases are not atomic. When the
//! second fails the account already exists; the [`OrphanedIdentityHook`] is told
//! about it and the caller gets [`AuthServiceError::SaveUserData`].

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::backend::{AuthError, AuthResponse, AuthUser, Credentials, IdentityProvider, Row};
use crate::services::data_service::{DataError, DataService};
use crate::validation::{validate_email, validate_password, ValidationError};

const USERS_TABLE: &str = "users";

#[derive(Debug, Error)]
pub enum AuthServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Temporary authentication error.")]
    Transient,

    /// Provider refusal, e.g. an already registered e-mail.
    #[error("{0}")]
    Rejected(String),

    #[error("Unknown error in the registration response.")]
    UnknownRegistration,

    #[error("Error saving the user data.")]
    SaveUserData { user_id: String },

    #[error("Could not sign in.")]
    SignIn,

    #[error("Error fetching the user data.")]
    FetchUserData { user_id: String },

    #[error("Unexpected error. Check the password length or the email.")]
    Unexpected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisteredUser {
    pub email: String,
    pub user_name: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginUser {
    pub email: Option<String>,
    pub user_name: Option<Value>,
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginResult {
    pub message: String,
    pub user: LoginUser,
}

/// An identity that exists at the provider without a `users` row.
#[derive(Debug, Clone, PartialEq)]
pub struct OrphanedIdentity {
    pub user_id: String,
    pub email: String,
    pub reason: String,
}

#[async_trait]
pub trait OrphanedIdentityHook: Send + Sync {
    async fn on_orphaned(&self, identity: &OrphanedIdentity);
}

/// Leaves a warning in the logs for manual reconciliation.
pub struct LogOrphanedIdentity;

#[async_trait]
impl OrphanedIdentityHook for LogOrphanedIdentity {
    async fn on_orphaned(&self, identity: &OrphanedIdentity) {
        tracing::warn!(
            user_id = %identity.user_id,
            email = %identity.email,
            reason = %identity.reason,
            "Identity created without a users row; needs reconciliation"
        );
    }
}

#[derive(Clone)]
pub struct AuthService {
    identity: Arc<dyn IdentityProvider>,
    data: DataService,
    orphans: Arc<dyn OrphanedIdentityHook>,
}

impl AuthService {
    pub fn new(identity: Arc<dyn IdentityProvider>, data: DataService) -> Self {
        Self {
            identity,
            data,
            orphans: Arc::new(LogOrphanedIdentity),
        }
    }

    pub fn with_orphan_hook(mut self, hook: Arc<dyn OrphanedIdentityHook>) -> Self {
        self.orphans = hook;
        self
    }

    pub async fn register(&self, email: &str, password: &str, user_name: &str) -> Result<RegisteredUser, AuthServiceError> {
        validate_email(email)?;
        validate_password(password)?;

        let response = self.create_identity(email, password).await?;
        let user = response.user.ok_or_else(|| {
            tracing::error!("Sign-up response carried no user");
            AuthServiceError::UnknownRegistration
        })?;

        self.persist_profile(&user, email, user_name).await?;

        let (access_token, refresh_token) = match response.session {
            Some(session) => (Some(session.access_token), Some(session.refresh_token)),
            None => (None, None),
        };
        tracing::info!(user_id = %user.id, "User registered");

        Ok(RegisteredUser {
            email: email.to_string(),
            user_name: user_name.to_string(),
            access_token,
            refresh_token,
        })
    }

    /// Phase one: the account at the identity provider.
    async fn create_identity(&self, email: &str, password: &str) -> Result<AuthResponse, AuthServiceError> {
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.identity
            .sign_up(&credentials)
            .await
            .map_err(|e| classify("sign-up", e))
    }

    /// Phase two: the `users` row.
    async fn persist_profile(&self, user: &AuthUser, email: &str, user_name: &str) -> Result<(), AuthServiceError> {
        let mut row = Row::new();
        row.insert("user_id".to_string(), Value::String(user.id.clone()));
        row.insert("user_name".to_string(), Value::String(user_name.to_string()));
        row.insert("user_email".to_string(), Value::String(email.to_string()));

        if let Err(e) = self.data.insert(USERS_TABLE, row).await {
            tracing::error!(user_id = %user.id, error = %e, details = ?e.details(), "Failed to insert users row");
            self.orphans
                .on_orphaned(&OrphanedIdentity {
                    user_id: user.id.clone(),
                    email: email.to_string(),
                    reason: e.to_string(),
                })
                .await;
            return Err(AuthServiceError::SaveUserData {
                user_id: user.id.clone(),
            });
        }
        Ok(())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult, AuthServiceError> {
        validate_email(email)?;
        validate_password(password)?;

        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .identity
            .sign_in_with_password(&credentials)
            .await
            .map_err(|e| classify("sign-in", e))?;

        let (user, session) = match (response.user, response.session) {
            (Some(user), Some(session)) => (user, session),
            _ => {
                tracing::error!("Sign-in response carried no user or session");
                return Err(AuthServiceError::SignIn);
            }
        };

        let rows = self
            .data
            .select(USERS_TABLE, "user_id", &user.id)
            .await
            .map_err(|e: DataError| {
                tracing::error!(user_id = %user.id, error = %e, "Failed to fetch users row after sign-in");
                AuthServiceError::FetchUserData { user_id: user.id.clone() }
            })?;

        // No row means no name, not an error
        let user_name = rows.into_iter().next().and_then(|mut row| row.remove("user_name"));
        tracing::info!(user_id = %user.id, "User signed in");

        Ok(LoginResult {
            message: "Login successful".to_string(),
            user: LoginUser {
                email: user.email,
                user_name,
                access_token: session.access_token,
            },
        })
    }
}

fn classify(step: &str, err: AuthError) -> AuthServiceError {
    match err {
        AuthError::Retryable(msg) => {
            tracing::error!(step, error = %msg, "Temporary authentication error");
            AuthServiceError::Transient
        }
        AuthError::Api { status, message } => {
            tracing::error!(step, status, error = %message, "Authentication API error");
            AuthServiceError::Rejected(message)
        }
        AuthError::Unexpected(msg) => {
            tracing::error!(step, error = %msg, "Unexpected authentication error");
            AuthServiceError::Unexpected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::schema::SchemaRegistry;
    use serde_json::json;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingHook {
        seen: Mutex<Vec<OrphanedIdentity>>,
    }

    #[async_trait]
    impl OrphanedIdentityHook for RecordingHook {
        async fn on_orphaned(&self, identity: &OrphanedIdentity) {
            self.seen.lock().await.push(identity.clone());
        }
    }

    struct FlakyIdentity(AuthError);

    #[async_trait]
    impl IdentityProvider for FlakyIdentity {
        async fn sign_up(&self, _: &Credentials) -> Result<AuthResponse, AuthError> {
            Err(self.0.clone())
        }

        async fn sign_in_with_password(&self, _: &Credentials) -> Result<AuthResponse, AuthError> {
            Err(self.0.clone())
        }
    }

    /// Answers every call with the same response shape.
    struct FixedIdentity(AuthResponse);

    #[async_trait]
    impl IdentityProvider for FixedIdentity {
        async fn sign_up(&self, _: &Credentials) -> Result<AuthResponse, AuthError> {
            Ok(self.0.clone())
        }

        async fn sign_in_with_password(&self, _: &Credentials) -> Result<AuthResponse, AuthError> {
            Ok(self.0.clone())
        }
    }

    fn fixed_service(response: AuthResponse) -> (AuthService, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new("secret", 1));
        let registry = Arc::new(SchemaRegistry::builtin().unwrap());
        let data = DataService::new(registry, backend.clone());
        (AuthService::new(Arc::new(FixedIdentity(response)), data), backend)
    }

    fn user() -> AuthUser {
        AuthUser {
            id: "user-1".into(),
            email: Some("ana@example.com".into()),
        }
    }

    fn setup() -> (AuthService, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new("secret", 1));
        let registry = Arc::new(SchemaRegistry::builtin().unwrap());
        let data = DataService::new(registry, backend.clone());
        (AuthService::new(backend.clone(), data), backend)
    }

    #[tokio::test]
    async fn register_writes_users_row_and_returns_tokens() {
        let (service, backend) = setup();
        let registered = service.register("ana@example.com", "abc123", "ana").await.unwrap();

        assert_eq!(registered.user_name, "ana");
        assert!(registered.access_token.is_some());
        assert!(registered.refresh_token.is_some());

        let users = backend.rows("users").await;
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["user_email"], json!("ana@example.com"));
        assert_eq!(users[0]["user_name"], json!("ana"));
    }

    #[tokio::test]
    async fn format_checks_run_before_the_provider() {
        let (service, backend) = setup();

        let err = service.register("not-an-email", "abc123", "ana").await.unwrap_err();
        assert!(matches!(err, AuthServiceError::Validation(ValidationError::InvalidEmail)));

        let err = service.register("ana@example.com", "abc1234", "ana").await.unwrap_err();
        assert!(matches!(err, AuthServiceError::Validation(ValidationError::InvalidPasswordLength)));

        let err = service.login("ana@example.com", "abc12").await.unwrap_err();
        assert!(matches!(err, AuthServiceError::Validation(ValidationError::InvalidPasswordLength)));

        assert_eq!(backend.identity_calls(), 0);
        assert_eq!(backend.store_calls(), 0);
    }

    #[tokio::test]
    async fn failed_users_insert_reports_save_error_and_orphan() {
        let (service, backend) = setup();
        let hook = Arc::new(RecordingHook::default());
        let service = service.with_orphan_hook(hook.clone());
        backend.fail_table("users").await;

        let err = service.register("ana@example.com", "abc123", "ana").await.unwrap_err();
        assert!(matches!(err, AuthServiceError::SaveUserData { .. }));
        assert_eq!(err.to_string(), "Error saving the user data.");

        // the account exists even though the row does not
        let seen = hook.seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].email, "ana@example.com");
        let credentials = Credentials {
            email: "ana@example.com".into(),
            password: "abc123".into(),
        };
        assert!(backend.sign_in_with_password(&credentials).await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected_with_provider_message() {
        let (service, _) = setup();
        service.register("ana@example.com", "abc123", "ana").await.unwrap();
        let err = service.register("ana@example.com", "abc123", "ana").await.unwrap_err();
        assert!(matches!(err, AuthServiceError::Rejected(ref m) if m == "User already registered"));
    }

    #[tokio::test]
    async fn provider_errors_are_classified() {
        let registry = Arc::new(SchemaRegistry::builtin().unwrap());
        let data = DataService::new(registry, Arc::new(MemoryBackend::new("secret", 1)));

        let transient = AuthService::new(Arc::new(FlakyIdentity(AuthError::Retryable("timeout".into()))), data.clone());
        assert!(matches!(
            transient.register("a@b.co", "123456", "a").await,
            Err(AuthServiceError::Transient)
        ));

        let unexpected = AuthService::new(Arc::new(FlakyIdentity(AuthError::Unexpected("boom".into()))), data);
        assert!(matches!(
            unexpected.login("a@b.co", "123456").await,
            Err(AuthServiceError::Unexpected)
        ));
    }

    #[tokio::test]
    async fn sign_up_without_session_returns_null_tokens() {
        let (service, backend) = fixed_service(AuthResponse {
            user: Some(user()),
            session: None,
        });

        let registered = service.register("ana@example.com", "abc123", "ana").await.unwrap();
        assert_eq!(registered.access_token, None);
        assert_eq!(registered.refresh_token, None);
        assert_eq!(backend.rows("users").await[0]["user_id"], json!("user-1"));

        let body = serde_json::to_value(&registered).unwrap();
        assert!(body["access_token"].is_null());
        assert!(body["refresh_token"].is_null());
    }

    #[tokio::test]
    async fn sign_up_without_user_is_unknown_registration() {
        let (service, backend) = fixed_service(AuthResponse::default());

        let err = service.register("ana@example.com", "abc123", "ana").await.unwrap_err();
        assert!(matches!(err, AuthServiceError::UnknownRegistration));
        assert_eq!(backend.store_calls(), 0);
    }

    #[tokio::test]
    async fn sign_in_without_user_or_session_cannot_sign_in() {
        let (service, _) = fixed_service(AuthResponse::default());
        let err = service.login("ana@example.com", "abc123").await.unwrap_err();
        assert!(matches!(err, AuthServiceError::SignIn));

        let (service, backend) = fixed_service(AuthResponse {
            user: Some(user()),
            session: None,
        });
        let err = service.login("ana@example.com", "abc123").await.unwrap_err();
        assert!(matches!(err, AuthServiceError::SignIn));
        assert_eq!(backend.store_calls(), 0);
    }

    #[tokio::test]
    async fn login_enriches_session_with_user_name() {
        let (service, _) = setup();
        service.register("ana@example.com", "abc123", "ana").await.unwrap();

        let result = service.login("ana@example.com", "abc123").await.unwrap();
        assert_eq!(result.message, "Login successful");
        assert_eq!(result.user.user_name, Some(json!("ana")));
        assert_eq!(result.user.email.as_deref(), Some("ana@example.com"));
        assert!(!result.user.access_token.is_empty());
    }

    #[tokio::test]
    async fn login_without_users_row_has_no_name() {
        let (service, backend) = setup();
        let credentials = Credentials {
            email: "bob@example.com".into(),
            password: "abc123".into(),
        };
        backend.sign_up(&credentials).await.unwrap();

        let result = service.login("bob@example.com", "abc123").await.unwrap();
        assert_eq!(result.user.user_name, None);
    }

    #[tokio::test]
    async fn login_row_fetch_failure() {
        let (service, backend) = setup();
        service.register("ana@example.com", "abc123", "ana").await.unwrap();
        backend.fail_table("users").await;

        let err = service.login("ana@example.com", "abc123").await.unwrap_err();
        assert!(matches!(err, AuthServiceError::FetchUserData { .. }));
    }
}
