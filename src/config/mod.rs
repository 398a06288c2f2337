use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub schema: SchemaConfig,
    pub security: SecurityConfig,
    pub keep_alive: KeepAliveConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Supabase,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// YAML file with `table: [columns...]`; the built-in allowlist is used when unset.
    pub tables_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
    pub allow_credentials: bool,
    pub token_expiry_hours: u64,
    #[serde(skip_serializing)]
    pub token_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeepAliveConfig {
    pub enabled: bool,
    /// Daily fire time in UTC, `HH:MM`.
    pub at: String,
    pub table: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid backend URL: {0}")]
    InvalidBackendUrl(String),

    #[error("Invalid keep-alive time '{0}', expected HH:MM")]
    InvalidKeepAliveTime(String),

    #[error("SECURITY_CORS_ORIGINS cannot contain '*' while SECURITY_ALLOW_CREDENTIALS is true")]
    WildcardCorsWithCredentials,
}

const ITCH_ORIGINS: &[&str] = &[
    "https://itch.io",
    "https://html-classic.itch.zone",
    "https://html.itch.zone",
];

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Backend overrides
        match env::var("BACKEND_KIND").as_deref() {
            Ok("supabase") => self.backend.kind = BackendKind::Supabase,
            Ok("memory") => self.backend.kind = BackendKind::Memory,
            _ => {}
        }
        if let Ok(v) = env::var("SUPABASE_URL") {
            self.backend.url = v;
        }
        if let Ok(v) = env::var("SUPABASE_KEY") {
            self.backend.api_key = v;
        }
        if let Ok(v) = env::var("BACKEND_TIMEOUT_SECS") {
            self.backend.timeout_secs = v.parse().unwrap_or(self.backend.timeout_secs);
        }

        // Schema overrides
        if let Ok(v) = env::var("SCHEMA_TABLES_PATH") {
            if !v.trim().is_empty() {
                self.schema.tables_path = Some(PathBuf::from(v));
            }
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("SECURITY_ALLOW_CREDENTIALS") {
            self.security.allow_credentials = v.parse().unwrap_or(self.security.allow_credentials);
        }
        if let Ok(v) = env::var("SECURITY_TOKEN_EXPIRY_HOURS") {
            self.security.token_expiry_hours = v.parse().unwrap_or(self.security.token_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_TOKEN_SECRET") {
            self.security.token_secret = v;
        }

        // Keep-alive overrides
        if let Ok(v) = env::var("KEEP_ALIVE_ENABLED") {
            self.keep_alive.enabled = v.parse().unwrap_or(self.keep_alive.enabled);
        }
        if let Ok(v) = env::var("KEEP_ALIVE_AT") {
            self.keep_alive.at = v;
        }
        if let Ok(v) = env::var("KEEP_ALIVE_TABLE") {
            self.keep_alive.table = v;
        }

        self
    }

    /// Checks the combinations that `from_env` cannot reject on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.kind == BackendKind::Supabase {
            if self.backend.url.is_empty() {
                return Err(ConfigError::Missing("SUPABASE_URL"));
            }
            if self.backend.api_key.is_empty() {
                return Err(ConfigError::Missing("SUPABASE_KEY"));
            }
            url::Url::parse(&self.backend.url)
                .map_err(|_| ConfigError::InvalidBackendUrl(self.backend.url.clone()))?;
        }
        if self.backend.kind == BackendKind::Memory && self.security.token_secret.is_empty() {
            return Err(ConfigError::Missing("SECURITY_TOKEN_SECRET"));
        }
        if self.security.allow_credentials && self.security.cors_origins.iter().any(|o| o.trim() == "*") {
            return Err(ConfigError::WildcardCorsWithCredentials);
        }
        self.keep_alive.time()?;
        Ok(())
    }

    fn development() -> Self {
        let mut cors_origins: Vec<String> = ITCH_ORIGINS.iter().map(|s| s.to_string()).collect();
        cors_origins.push("http://localhost:3000".to_string());
        cors_origins.push("http://localhost:8000".to_string());

        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            backend: BackendConfig {
                kind: BackendKind::Memory,
                url: String::new(),
                api_key: String::new(),
                timeout_secs: 30,
            },
            schema: SchemaConfig::default(),
            security: SecurityConfig {
                cors_origins,
                allow_credentials: true,
                token_expiry_hours: 24,
                token_secret: "development-only-secret".to_string(),
            },
            keep_alive: KeepAliveConfig {
                enabled: false,
                at: "12:00".to_string(),
                table: "keep_alive".to_string(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            backend: BackendConfig {
                kind: BackendKind::Supabase,
                url: String::new(),
                api_key: String::new(),
                timeout_secs: 15,
            },
            schema: SchemaConfig::default(),
            security: SecurityConfig {
                cors_origins: ITCH_ORIGINS.iter().map(|s| s.to_string()).collect(),
                allow_credentials: true,
                token_expiry_hours: 24,
                token_secret: String::new(),
            },
            keep_alive: KeepAliveConfig {
                enabled: false,
                at: "12:00".to_string(),
                table: "keep_alive".to_string(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            backend: BackendConfig {
                kind: BackendKind::Supabase,
                url: String::new(),
                api_key: String::new(),
                timeout_secs: 10,
            },
            schema: SchemaConfig::default(),
            security: SecurityConfig {
                cors_origins: ITCH_ORIGINS.iter().map(|s| s.to_string()).collect(),
                allow_credentials: true,
                token_expiry_hours: 4,
                token_secret: String::new(),
            },
            keep_alive: KeepAliveConfig {
                enabled: true,
                at: "12:00".to_string(),
                table: "keep_alive".to_string(),
            },
        }
    }

    /// Development preset with the in-memory backend and no env overrides applied.
    pub fn for_memory_backend() -> Self {
        Self::development()
    }
}

impl KeepAliveConfig {
    pub fn time(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(self.at.trim(), "%H:%M")
            .map_err(|_| ConfigError::InvalidKeepAliveTime(self.at.clone()))
    }
}
