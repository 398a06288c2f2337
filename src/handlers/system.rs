use axum::{extract::State, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::state::AppState;

/// GET / - Service banner with the route map
pub async fn root(State(state): State<Arc<AppState>>) -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Scoreboard API",
            "version": version,
            "environment": state.config.environment,
            "endpoints": {
                "auth": ["POST /api/auth/register", "POST /api/auth/login"],
                "data": [
                    "GET /api/data/select",
                    "POST /api/data/insert",
                    "PUT /api/data/update",
                    "DELETE /api/data/delete"
                ],
                "scores": ["GET /api/scores/top"],
                "keep_alive": ["POST /api/keep_alive", "GET /api/next-keep-alive"],
                "tables": state.registry.tables().collect::<Vec<_>>(),
            }
        }
    }))
}

/// GET /health - Liveness; does not call the backend
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": chrono::Utc::now(),
            "backend": state.config.backend.kind,
        }
    }))
}
