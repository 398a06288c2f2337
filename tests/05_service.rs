mod common;

use anyhow::Result;
use reqwest::{header, Method, StatusCode};

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::start_server().await?;

    let res = server.client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["backend"], "memory");
    Ok(())
}

#[tokio::test]
async fn root_lists_routes_and_tables() -> Result<()> {
    let server = common::start_server().await?;

    let body = server
        .client
        .get(server.url("/"))
        .send()
        .await?
        .json::<serde_json::Value>()
        .await?;
    let tables = body["data"]["endpoints"]["tables"].as_array().cloned().unwrap_or_default();
    assert!(tables.iter().any(|t| t == "scores"), "missing scores table: {}", body);
    Ok(())
}

#[tokio::test]
async fn unknown_route_is_a_json_404() -> Result<()> {
    let server = common::start_server().await?;

    let res = server.client.get(server.url("/api/nope")).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn cors_allows_itch_hosts_only() -> Result<()> {
    let server = common::start_server().await?;

    let allowed = server
        .client
        .request(Method::OPTIONS, server.url("/api/scores/top"))
        .header(header::ORIGIN, "https://html-classic.itch.zone")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .send()
        .await?;
    assert_eq!(
        allowed.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).and_then(|v| v.to_str().ok()),
        Some("https://html-classic.itch.zone")
    );
    assert_eq!(
        allowed.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).and_then(|v| v.to_str().ok()),
        Some("true")
    );

    let denied = server
        .client
        .request(Method::OPTIONS, server.url("/api/scores/top"))
        .header(header::ORIGIN, "https://evil.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .send()
        .await?;
    assert!(denied.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    Ok(())
}
