#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::Value;

use scoreboard_api::backend::{Backends, MemoryBackend, Row};
use scoreboard_api::config::AppConfig;
use scoreboard_api::schema::SchemaRegistry;
use scoreboard_api::state::AppState;

/// One router per test, served in-process over the in-memory backend.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub backend: Arc<MemoryBackend>,
    pub state: Arc<AppState>,
    pub client: reqwest::Client,
}

impl TestServer {
    async fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = AppConfig::for_memory_backend();
        let backend = Arc::new(MemoryBackend::new(
            config.security.token_secret.clone(),
            config.security.token_expiry_hours,
        ));
        let registry = SchemaRegistry::builtin()?;
        let state = AppState::new(config, registry, Backends::shared(backend.clone())).shared();

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind {}", base_url))?;
        let app = scoreboard_api::app(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            port,
            base_url,
            backend,
            state,
            client: reqwest::Client::new(),
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Registers an account through the API and returns the response body.
    pub async fn register(&self, email: &str, password: &str, user_name: &str) -> Result<Value> {
        let res = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&serde_json::json!({"email": email, "password": password, "user_name": user_name}))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "register failed: {}", res.status());
        Ok(res.json().await?)
    }
}

pub async fn start_server() -> Result<TestServer> {
    let server = TestServer::spawn().await?;
    server.wait_ready(Duration::from_secs(5)).await?;
    Ok(server)
}

pub fn row(value: Value) -> Row {
    value.as_object().cloned().unwrap_or_default()
}
