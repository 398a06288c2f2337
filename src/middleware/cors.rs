use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::SecurityConfig;

/// Build the CORS layer from the security settings.
///
/// Origins outside the list get no CORS headers. A `*` entry allows any origin
/// but never with credentials.
pub fn build_cors_layer(security: &SecurityConfig) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS];
    let headers = [header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT];

    if security.cors_origins.iter().any(|o| o.trim() == "*") {
        if security.allow_credentials {
            tracing::warn!("CORS: wildcard origin configured, credentials disabled");
        }
        return CorsLayer::new()
            .allow_origin(AllowOrigin::any())
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(false);
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    tracing::debug!("CORS: Allowed origins: {:?}", security.cors_origins);

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(security.allow_credentials)
}
