use axum::extract::State;
use std::sync::Arc;

use crate::backend::query::scalar_text;
use crate::backend::Row;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiQuery, ApiResponse, ApiResult};
use crate::state::AppState;
use crate::types::{InsertRequest, RowFilterQuery, UpdateRequest};

/// GET /api/data/select - Rows where `column` equals `value`
pub async fn select(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<RowFilterQuery>,
) -> ApiResult<Vec<Row>> {
    let rows = state.data.select(&query.table, &query.column, &query.value).await?;
    Ok(ApiResponse::success(rows))
}

/// POST /api/data/insert - Insert one row, returning what the store wrote
pub async fn insert(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<InsertRequest>,
) -> ApiResult<Vec<Row>> {
    let rows = state
        .data
        .insert(&body.table, body.data)
        .await
        .map_err(ApiError::from_write_error)?;
    Ok(ApiResponse::created(rows))
}

/// PUT /api/data/update - Apply `data` to rows where `column` equals `value`
pub async fn update(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<UpdateRequest>,
) -> ApiResult<Vec<Row>> {
    let value = scalar_text(&body.value);
    let rows = state
        .data
        .update(&body.table, body.data, &body.column, &value)
        .await
        .map_err(ApiError::from_write_error)?;
    Ok(ApiResponse::success(rows))
}

/// DELETE /api/data/delete - Remove rows where `column` equals `value`
pub async fn delete(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<RowFilterQuery>,
) -> ApiResult<Vec<Row>> {
    let rows = state
        .data
        .delete(&query.table, &query.column, &query.value)
        .await
        .map_err(ApiError::from_write_error)?;
    Ok(ApiResponse::success(rows))
}
