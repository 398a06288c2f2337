mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn insert_then_select_by_column() -> Result<()> {
    let server = common::start_server().await?;

    let res = server
        .client
        .post(server.url("/api/data/insert"))
        .json(&json!({"table": "games", "data": {"game_id": 7, "game_name": "Snake"}}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED, "insert failed: {}", res.status());
    let inserted = res.json::<Value>().await?;
    assert_eq!(inserted[0]["game_name"], "Snake");

    // Query-string values are text; the row holds a number
    let res = server
        .client
        .get(server.url("/api/data/select"))
        .query(&[("table", "games"), ("column", "game_id"), ("value", "7")])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let rows = res.json::<Value>().await?;
    assert!(rows.is_array(), "select should return a bare array: {}", rows);
    assert_eq!(rows[0]["game_name"], "Snake");
    Ok(())
}

#[tokio::test]
async fn update_and_delete_return_affected_rows() -> Result<()> {
    let server = common::start_server().await?;
    server
        .backend
        .seed("games", vec![common::row(json!({"game_id": 1, "game_name": "Snake"}))])
        .await;

    let res = server
        .client
        .put(server.url("/api/data/update"))
        .json(&json!({"table": "games", "data": {"game_name": "Snake II"}, "column": "game_id", "value": 1}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let updated = res.json::<Value>().await?;
    assert_eq!(updated[0]["game_name"], "Snake II");

    let res = server
        .client
        .delete(server.url("/api/data/delete"))
        .query(&[("table", "games"), ("column", "game_id"), ("value", "1")])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let deleted = res.json::<Value>().await?;
    assert_eq!(deleted.as_array().map(|a| a.len()), Some(1));
    assert!(server.backend.rows("games").await.is_empty());
    Ok(())
}

#[tokio::test]
async fn unknown_table_is_rejected_without_backend_call() -> Result<()> {
    let server = common::start_server().await?;

    let res = server
        .client
        .get(server.url("/api/data/select"))
        .query(&[("table", "secrets"), ("column", "id"), ("value", "1")])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<Value>().await?;
    assert_eq!(body["message"], "Invalid table.");

    let res = server
        .client
        .post(server.url("/api/data/insert"))
        .json(&json!({"table": "secrets", "data": {"x": 1}}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .client
        .put(server.url("/api/data/update"))
        .json(&json!({"table": "secrets", "data": {"x": 2}, "column": "x", "value": "1"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<Value>().await?;
    assert_eq!(body["message"], "Invalid table.");

    let res = server
        .client
        .delete(server.url("/api/data/delete"))
        .query(&[("table", "secrets"), ("column", "x"), ("value", "1")])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    assert_eq!(server.backend.store_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn unknown_column_is_rejected() -> Result<()> {
    let server = common::start_server().await?;

    let res = server
        .client
        .delete(server.url("/api/data/delete"))
        .query(&[("table", "games"), ("column", "password"), ("value", "x")])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<Value>().await?;
    assert_eq!(body["message"], "Invalid column.");

    let res = server
        .client
        .post(server.url("/api/data/insert"))
        .json(&json!({"table": "games", "data": {"game_name": "x", "owner": "me"}}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(server.backend.store_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn backend_failure_status_depends_on_route() -> Result<()> {
    let server = common::start_server().await?;
    server.backend.fail_table("games").await;

    let select = server
        .client
        .get(server.url("/api/data/select"))
        .query(&[("table", "games"), ("column", "game_id"), ("value", "1")])
        .send()
        .await?;
    assert_eq!(select.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = select.json::<Value>().await?;
    assert_eq!(body["message"], "Error executing the query.");
    assert!(body.get("details").is_some(), "backend detail missing: {}", body);

    let insert = server
        .client
        .post(server.url("/api/data/insert"))
        .json(&json!({"table": "games", "data": {"game_name": "x"}}))
        .send()
        .await?;
    assert_eq!(insert.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn missing_query_parameter_is_a_json_400() -> Result<()> {
    let server = common::start_server().await?;

    let res = server
        .client
        .get(server.url("/api/data/select"))
        .query(&[("table", "games")])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<Value>().await?;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    Ok(())
}
