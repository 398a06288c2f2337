use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::middleware::StatusEnvelope;
use crate::services::KEEP_ALIVE_JOB;
use crate::state::AppState;

/// POST /api/keep_alive - Write one keep-alive row now
pub async fn run(State(state): State<Arc<AppState>>) -> (StatusCode, Json<StatusEnvelope>) {
    match state.keep_alive.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(StatusEnvelope::success("Keep-alive executed successfully.")),
        ),
        Err(e) => {
            let details = e.details().cloned().unwrap_or_else(|| Value::from("No details."));
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusEnvelope::error(
                    format!("Error executing the keep-alive: {}", e),
                    details,
                )),
            )
        }
    }
}

/// GET /api/next-keep-alive - When the scheduled job fires next
pub async fn next_run(State(state): State<Arc<AppState>>) -> Json<Value> {
    match state.scheduler.next_run(KEEP_ALIVE_JOB).await {
        Some(next) => Json(json!({ "next_run": next })),
        None => Json(json!({ "message": "No keep-alive job scheduled." })),
    }
}
