pub mod backend;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod schema;
pub mod services;
pub mod state;
pub mod types;
pub mod validation;

use axum::{
    body::Body,
    http::{Response, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use std::any::Any;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::error::ApiError;
use crate::state::AppState;

/// The full HTTP surface: `/`, `/health` and everything under `/api`.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = middleware::build_cors_layer(&state.config.security);

    Router::new()
        .route("/", get(handlers::system::root))
        .route("/health", get(handlers::system::health))
        .nest("/api", api_routes())
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(CatchPanicLayer::custom(handle_panic)),
        )
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(auth_routes())
        .merge(data_routes())
        .route("/scores/top", get(handlers::scores::top))
        .route("/keep_alive", post(handlers::keep_alive::run))
        .route("/next-keep-alive", get(handlers::keep_alive::next_run))
}

fn auth_routes() -> Router<Arc<AppState>> {
    use handlers::auth;

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
}

fn data_routes() -> Router<Arc<AppState>> {
    use handlers::data;

    Router::new()
        .route("/data/select", get(data::select))
        .route("/data/insert", post(data::insert))
        .route("/data/update", put(data::update))
        .route("/data/delete", delete(data::delete))
}

async fn not_found() -> (StatusCode, axum::Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        axum::Json(serde_json::json!({
            "success": false,
            "error": "Not found",
            "message": "Not found",
            "code": "NOT_FOUND"
        })),
    )
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");

    ApiError::internal_server_error("Unexpected error.").into_response()
}
